//! Host port: lets the kernel build and run its unit tests off-target.
//! Tasks never start here, so there is nothing to switch.

/// No context switch on the host.
#[inline]
pub fn trigger_pendsv() {}

#[inline]
pub fn wait_for_interrupt() {
    core::hint::spin_loop();
}

pub fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}
