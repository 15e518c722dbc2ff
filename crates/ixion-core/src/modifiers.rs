//! Access and property flags for classes, fields, and methods.

use bitflags::bitflags;

bitflags! {
    /// Modifier flags. Bit values follow the target's access-flag encoding so
    /// artifacts can hand them to the class writer unchanged.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
    }
}

impl Modifiers {
    #[inline]
    pub fn is_static(self) -> bool {
        self.contains(Modifiers::STATIC)
    }

    #[inline]
    pub fn is_private(self) -> bool {
        self.contains(Modifiers::PRIVATE)
    }

    #[inline]
    pub fn is_public(self) -> bool {
        self.contains(Modifiers::PUBLIC)
    }

    #[inline]
    pub fn is_final(self) -> bool {
        self.contains(Modifiers::FINAL)
    }

    #[inline]
    pub fn is_abstract(self) -> bool {
        self.contains(Modifiers::ABSTRACT)
    }
}
