use std::fmt;

/// Dtype code of a host array, numbered the way the NumPy C API numbers its
/// types. Only the codes the host model can actually hold are backed by a
/// [`HostData`](super::HostData) variant; the rest exist so that type mapping
/// can name and reject them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostDType(pub i32);

impl HostDType {
    /// Sentinel returned when an element type has no host analogue.
    pub const UNSUPPORTED: HostDType = HostDType(-1);

    pub const BOOL: HostDType = HostDType(0);
    pub const BYTE: HostDType = HostDType(1);
    pub const UBYTE: HostDType = HostDType(2);
    pub const SHORT: HostDType = HostDType(3);
    pub const USHORT: HostDType = HostDType(4);
    pub const INT: HostDType = HostDType(5);
    pub const UINT: HostDType = HostDType(6);
    pub const LONG: HostDType = HostDType(7);
    pub const ULONG: HostDType = HostDType(8);
    pub const LONGLONG: HostDType = HostDType(9);
    pub const ULONGLONG: HostDType = HostDType(10);
    pub const FLOAT: HostDType = HostDType(11);
    pub const DOUBLE: HostDType = HostDType(12);
    pub const LONGDOUBLE: HostDType = HostDType(13);
    pub const CFLOAT: HostDType = HostDType(14);
    pub const CDOUBLE: HostDType = HostDType(15);
    pub const CLONGDOUBLE: HostDType = HostDType(16);
    pub const OBJECT: HostDType = HostDType(17);
    pub const STRING: HostDType = HostDType(18);
    pub const UNICODE: HostDType = HostDType(19);
    pub const VOID: HostDType = HostDType(20);
    pub const HALF: HostDType = HostDType(23);

    pub fn code(self) -> i32 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self != Self::UNSUPPORTED
    }

    pub fn name(self) -> &'static str {
        match self.0 {
            -1 => "unsupported",
            0 => "bool",
            1 => "byte",
            2 => "ubyte",
            3 => "short",
            4 => "ushort",
            5 => "int",
            6 => "uint",
            7 => "long",
            8 => "ulong",
            9 => "longlong",
            10 => "ulonglong",
            11 => "float",
            12 => "double",
            13 => "longdouble",
            14 => "cfloat",
            15 => "cdouble",
            16 => "clongdouble",
            17 => "object",
            18 => "string",
            19 => "unicode",
            20 => "void",
            23 => "half",
            _ => "unknown",
        }
    }

    /// Element width in bytes for the fixed-width codes the host model
    /// stores, `None` otherwise. `LONG` follows LP64.
    pub fn itemsize(self) -> Option<usize> {
        match self {
            Self::BOOL | Self::BYTE | Self::UBYTE => Some(1),
            Self::SHORT | Self::USHORT | Self::HALF => Some(2),
            Self::INT | Self::UINT | Self::FLOAT => Some(4),
            Self::LONG | Self::ULONG | Self::LONGLONG | Self::ULONGLONG | Self::DOUBLE => Some(8),
            _ => None,
        }
    }
}

impl fmt::Display for HostDType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}
