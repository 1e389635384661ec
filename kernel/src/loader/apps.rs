//! User programs linked into the kernel image by `build.rs`

use alloc::vec::Vec;

#[cfg(target_os = "none")]
core::arch::global_asm!(include_str!(concat!(env!("OUT_DIR"), "/link_apps.S")));

/// `(name, ELF image)` for every embedded program
#[cfg(target_os = "none")]
pub fn embedded_apps() -> Vec<(&'static str, &'static [u8])> {
    extern "C" {
        fn _num_app();
        fn _app_names();
    }
    let num_app_ptr = _num_app as usize as *const usize;
    let num_app = unsafe { num_app_ptr.read_volatile() };
    let app_start = unsafe { core::slice::from_raw_parts(num_app_ptr.add(1), num_app + 1) };

    let mut apps = Vec::with_capacity(num_app);
    let mut name_ptr = _app_names as usize as *const u8;
    for i in 0..num_app {
        let mut len = 0;
        unsafe {
            while name_ptr.add(len).read_volatile() != 0 {
                len += 1;
            }
        }
        let name_bytes = unsafe { core::slice::from_raw_parts(name_ptr, len) };
        name_ptr = unsafe { name_ptr.add(len + 1) };
        let Ok(name) = core::str::from_utf8(name_bytes) else {
            log::warn!("app {} has a non-UTF-8 name, skipped", i);
            continue;
        };
        let image = unsafe {
            core::slice::from_raw_parts(app_start[i] as *const u8, app_start[i + 1] - app_start[i])
        };
        apps.push((name, image));
    }
    apps
}

/// Hosted builds carry no user programs
#[cfg(not(target_os = "none"))]
pub fn embedded_apps() -> Vec<(&'static str, &'static [u8])> {
    Vec::new()
}
