//! Denormal suppression for the audio thread
//!
//! Filter memories decaying towards zero pass through the subnormal range,
//! where many CPUs fall back to slow microcode. [`ScopedNoDenormals`] turns on
//! flush-to-zero for the current thread and puts the previous floating-point
//! control state back when it goes out of scope.

/// RAII guard enabling flush-to-zero on the current thread.
///
/// - x86_64: MXCSR FTZ and DAZ
/// - aarch64: FPCR FZ
/// - other targets: no-op
///
/// The guard is `!Send`; the control register belongs to the thread that
/// created it.
#[derive(Debug)]
pub struct ScopedNoDenormals {
    previous: Option<usize>,
    _not_send: std::marker::PhantomData<*const ()>,
}

impl ScopedNoDenormals {
    pub fn new() -> Self {
        Self {
            previous: arch::enable_flush_to_zero(),
            _not_send: std::marker::PhantomData,
        }
    }

    /// Whether this target has a flush-to-zero mode the guard controls
    pub fn is_supported() -> bool {
        cfg!(any(target_arch = "x86_64", target_arch = "aarch64"))
    }
}

impl Default for ScopedNoDenormals {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScopedNoDenormals {
    fn drop(&mut self) {
        if let Some(previous) = self.previous {
            arch::restore(previous);
        }
    }
}

#[cfg(target_arch = "x86_64")]
mod arch {
    use std::arch::asm;

    const FTZ: u32 = 0x8000;
    const DAZ: u32 = 0x0040;

    pub fn enable_flush_to_zero() -> Option<usize> {
        let previous = read_mxcsr();
        write_mxcsr(previous | FTZ | DAZ);
        Some(previous as usize)
    }

    pub fn restore(previous: usize) {
        write_mxcsr(previous as u32);
    }

    fn read_mxcsr() -> u32 {
        let mut csr: u32 = 0;
        // SAFETY: stmxcsr only stores the control register into `csr`.
        unsafe {
            asm!("stmxcsr [{}]", in(reg) &mut csr, options(nostack, preserves_flags));
        }
        csr
    }

    fn write_mxcsr(csr: u32) {
        // SAFETY: the value comes from stmxcsr with only FTZ/DAZ added, so no
        // reserved bits are set.
        unsafe {
            asm!("ldmxcsr [{}]", in(reg) &csr, options(nostack, readonly, preserves_flags));
        }
    }
}

#[cfg(target_arch = "aarch64")]
mod arch {
    use std::arch::asm;

    const FZ: u64 = 1 << 24;

    pub fn enable_flush_to_zero() -> Option<usize> {
        let previous = read_fpcr();
        write_fpcr(previous | FZ);
        Some(previous as usize)
    }

    pub fn restore(previous: usize) {
        write_fpcr(previous as u64);
    }

    fn read_fpcr() -> u64 {
        let fpcr: u64;
        // SAFETY: reading FPCR has no side effects.
        unsafe {
            asm!("mrs {}, fpcr", out(reg) fpcr, options(nomem, nostack, preserves_flags));
        }
        fpcr
    }

    fn write_fpcr(fpcr: u64) {
        // SAFETY: only the FZ bit differs from a value read from FPCR.
        unsafe {
            asm!("msr fpcr, {}", in(reg) fpcr, options(nomem, nostack, preserves_flags));
        }
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
mod arch {
    pub fn enable_flush_to_zero() -> Option<usize> {
        None
    }

    pub fn restore(_previous: usize) {}
}
