use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use strum::{Display, EnumString};

/// Declared type of a result column, as reported by the executor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ColumnType {
    Null,
    Int64,
    UInt64,
    Float64,
    VarChar,
    VarBinary,
}

impl ColumnType {
    /// Returns `true` if values of this type can be read back as a 64-bit integer.
    #[inline]
    pub fn is_integer_coercible(&self) -> bool {
        matches!(
            self,
            ColumnType::Int64 | ColumnType::UInt64 | ColumnType::VarChar | ColumnType::VarBinary
        )
    }

    /// Returns `true` if values of this type can be read back as text.
    #[inline]
    pub fn is_string_coercible(&self) -> bool {
        !matches!(self, ColumnType::Null | ColumnType::Float64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    name: SmolStr,
    ty: ColumnType,
}

impl Field {
    #[inline]
    pub fn new(name: impl Into<SmolStr>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn ty(&self) -> ColumnType {
        self.ty
    }
}
