// Copyright 2025-2026 Neil Henderson
//
//! The `types` module defines the [IrType] sum over the types a MiniC value can have.

use std::fmt;

/// An IR data type.
///
/// An `Array` with `count == 0` is an array-parameter pointer: the outermost dimension of an
/// array parameter decays at the function boundary, and such a type prints as `T*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrType {
    Void,
    Bool,
    Int32,
    Array { element: Box<IrType>, count: u32 },
    Pointer { pointee: Box<IrType> },
}

impl IrType {
    /// Creates an array type over the given element type.
    pub fn array_of(element: IrType, count: u32) -> Self {
        IrType::Array { element: Box::new(element), count }
    }

    /// Creates a pointer type to the given pointee.
    pub fn pointer_to(pointee: IrType) -> Self {
        IrType::Pointer { pointee: Box::new(pointee) }
    }

    /// Builds the right-nested array type for the given dimensions, innermost last.
    /// A leading dimension of zero marks an array-parameter pointer.
    pub fn array_from_dims(dims: &[u32]) -> Self {
        let mut ty = IrType::Int32;
        for &dim in dims.iter().rev() {
            ty = IrType::array_of(ty, dim);
        }
        ty
    }

    /// The size of the type in bytes.
    pub fn size_in_bytes(&self) -> u32 {
        match self {
            IrType::Void => 0,
            IrType::Bool | IrType::Int32 | IrType::Pointer { .. } => 4,
            IrType::Array { element, count } => element.size_in_bytes() * count,
        }
    }

    /// Is this type an array (including an array-parameter pointer)?
    pub fn is_array(&self) -> bool {
        matches!(self, IrType::Array { .. })
    }

    /// Is this type an array-parameter pointer (`count == 0`)?
    pub fn is_array_pointer(&self) -> bool {
        matches!(self, IrType::Array { count: 0, .. })
    }

    /// Is this type usable as a 32-bit scalar operand?
    pub fn is_scalar(&self) -> bool {
        matches!(self, IrType::Bool | IrType::Int32)
    }

    /// The dimensions of an array type, outermost first. A scalar has no dimensions.
    pub fn array_dims(&self) -> Vec<u32> {
        let mut dims = Vec::new();
        let mut ty = self;
        while let IrType::Array { element, count } = ty {
            dims.push(*count);
            ty = element;
        }
        dims
    }

    /// The type remaining after indexing through `depth` array dimensions.
    pub fn strip_dims(&self, depth: usize) -> &IrType {
        let mut ty = self;
        for _ in 0..depth {
            let IrType::Array { element, .. } = ty else {
                return ty;
            };
            ty = element;
        }
        ty
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::Bool => write!(f, "i1"),
            IrType::Int32 => write!(f, "i32"),
            IrType::Array { element, count: 0 } => write!(f, "{element}*"),
            IrType::Array { element, count } => write!(f, "[{count} x {element}]"),
            IrType::Pointer { pointee } => write!(f, "{pointee}*"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_sizes() {
        assert_eq!(IrType::Void.size_in_bytes(), 0);
        assert_eq!(IrType::Bool.size_in_bytes(), 4);
        assert_eq!(IrType::Int32.size_in_bytes(), 4);
        assert_eq!(IrType::pointer_to(IrType::Int32).size_in_bytes(), 4);
    }

    #[test]
    fn array_sizes_multiply_out() {
        let ty = IrType::array_from_dims(&[3, 4]);
        assert_eq!(ty.size_in_bytes(), 48);
        assert_eq!(ty.array_dims(), vec![3, 4]);
    }

    #[test]
    fn array_parameter_pointer_prints_as_pointer() {
        let ty = IrType::array_from_dims(&[0, 4]);
        assert_eq!(ty.to_string(), "[4 x i32]*");
        assert!(ty.is_array_pointer());

        let ty = IrType::array_from_dims(&[0]);
        assert_eq!(ty.to_string(), "i32*");
    }

    #[test]
    fn strip_dims_descends_into_elements() {
        let ty = IrType::array_from_dims(&[3, 4]);
        assert_eq!(ty.strip_dims(1).to_string(), "[4 x i32]");
        assert_eq!(*ty.strip_dims(2), IrType::Int32);
    }
}
