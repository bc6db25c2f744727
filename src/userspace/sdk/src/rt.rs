//! Process entry, heap and panic handling for programs on the real kernel.

use core::ffi::{c_char, CStr};
use core::panic::PanicInfo;
use core::ptr::addr_of_mut;

use konsoli_common::param::MAX_ARGS;
use linked_list_allocator::LockedHeap;

use crate::{exit, Kernel};

/// Size of each process's heap.
pub const HEAP_SIZE: usize = 16 * 1024;

static mut HEAP: [u8; HEAP_SIZE] = [0; HEAP_SIZE];

#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Runs `main` with the process arguments and exits with its status.
///
/// # Safety
///
/// `argv` must point at `argc` valid C strings, and this must be the first
/// thing the process does.
pub unsafe fn start(
    argc: i32,
    argv: *const *const c_char,
    main: fn(&mut Kernel, &[&CStr]) -> i32,
) -> ! {
    // SAFETY: HEAP is used by nothing but the allocator, which is
    // initialized exactly once here.
    unsafe { ALLOCATOR.lock().init(addr_of_mut!(HEAP).cast(), HEAP_SIZE) };

    let argc = (argc.max(0) as usize).min(MAX_ARGS);
    let mut args: [&CStr; MAX_ARGS] = [c""; MAX_ARGS];
    for (i, slot) in args[..argc].iter_mut().enumerate() {
        // SAFETY: the caller guarantees argc valid entries.
        *slot = unsafe { CStr::from_ptr(*argv.add(i)) };
    }
    exit(main(&mut Kernel, &args[..argc]))
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    crate::fprintln!(&mut Kernel, 2, "{}", info);
    exit(1)
}

/// Defines the process entry point `start`, which runs `$main`.
#[macro_export]
macro_rules! entry {
    ($main:path) => {
        #[no_mangle]
        pub unsafe extern "C" fn start(argc: i32, argv: *const *const core::ffi::c_char) -> ! {
            unsafe { $crate::rt::start(argc, argv, $main) }
        }
    };
}
