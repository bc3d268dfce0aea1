mod add;
mod cmp;
pub(crate) mod common;
mod div;
mod mul;

pub(crate) use add::{add_impl, sub_impl};
pub(crate) use cmp::cmp_impl;
pub(crate) use div::div_impl;
pub(crate) use mul::mul_impl;
