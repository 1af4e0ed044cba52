use crate::error::Error;

/// Number of elements described by `dims`, failing on overflow.
/// An empty `dims` is a scalar and holds one element.
pub fn size_from_dims(dims: &[usize]) -> Result<usize, Error> {
    dims.iter().try_fold(1usize, |acc, &d| {
        acc.checked_mul(d).ok_or_else(|| {
            Error::ShapeError(format!("Element count of shape {:?} overflows usize", dims))
        })
    })
}

/// Byte size of `count` elements of width `itemsize`, failing on overflow.
pub fn nbytes_for(count: usize, itemsize: usize) -> Result<usize, Error> {
    count.checked_mul(itemsize).ok_or_else(|| {
        Error::ShapeError(format!(
            "Byte size of {} elements of {} bytes overflows usize",
            count, itemsize
        ))
    })
}
