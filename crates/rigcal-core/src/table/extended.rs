use ndarray::ArrayD;

use super::{check_shape, concat_field, insert_field, take_field, Table};
use crate::Result;

/// A table with one additional field of the same leading shape.
///
/// Built by [`Table::extend`]; it is itself a [`Table`], so extensions can
/// be indexed, sequenced and concatenated like the base kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Extended<T, U> {
    base: T,
    name: &'static str,
    extra: ArrayD<U>,
}

impl<T: Table, U: Clone> Extended<T, U> {
    pub fn new(base: T, name: &'static str, extra: ArrayD<U>) -> Result<Self> {
        check_shape(name, base.shape(), extra.shape())?;
        Ok(Self { base, name, extra })
    }

    pub fn base(&self) -> &T {
        &self.base
    }

    /// Name the extra field was attached under.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn extra(&self) -> &ArrayD<U> {
        &self.extra
    }

    pub fn into_parts(self) -> (T, ArrayD<U>) {
        (self.base, self.extra)
    }
}

impl<T: Table, U: Clone> Table for Extended<T, U> {
    fn shape(&self) -> &[usize] {
        self.base.shape()
    }

    fn take(&self, axis: usize, index: usize) -> Self {
        Self {
            base: self.base.take(axis, index),
            name: self.name,
            extra: take_field(&self.extra, axis, index),
        }
    }

    fn insert_axis(&self, axis: usize) -> Self {
        Self {
            base: self.base.insert_axis(axis),
            name: self.name,
            extra: insert_field(&self.extra, axis),
        }
    }

    fn concat_fields(axis: usize, parts: &[Self]) -> Result<Self> {
        let bases: Vec<T> = parts.iter().map(|p| p.base.clone()).collect();
        let name = parts.first().map_or("extra", |p| p.name);
        Ok(Self {
            base: T::concat_fields(axis, &bases)?,
            name,
            extra: concat_field(name, axis, parts.iter().map(|p| p.extra.view()))?,
        })
    }
}
