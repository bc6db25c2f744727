//! Flags accepted by `open`.

use bitflags::bitflags;

bitflags! {
    /// Open mode of a path.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct OpenFlags: u32 {
        /// Open for writing only.
        const WRONLY = 0x001;
        /// Open for reading and writing.
        const RDWR   = 0x002;
        /// Create the file if it does not exist.
        const CREATE = 0x200;
    }
}

impl OpenFlags {
    /// Open for reading only.
    pub const RDONLY: OpenFlags = OpenFlags::empty();

    /// Whether descriptors opened with these flags may be read from.
    pub fn readable(self) -> bool {
        !self.contains(OpenFlags::WRONLY)
    }

    /// Whether descriptors opened with these flags may be written to.
    pub fn writable(self) -> bool {
        self.intersects(OpenFlags::WRONLY | OpenFlags::RDWR)
    }
}
