//
// Copyright (c) Memfault, Inc.
// See License.txt for details
//! Delivery of measurements to collectd.
use eyre::Result;

mod putval;
pub use putval::PutvalSink;

mod value_list;
pub use value_list::ValueList;

/// Receives every value list produced by a read cycle.
#[cfg_attr(test, mockall::automock)]
pub trait MetricSink {
    fn dispatch(&mut self, value_list: ValueList) -> Result<()>;
}
