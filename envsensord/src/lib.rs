//
// Copyright (c) Memfault, Inc.
// See License.txt for details
pub mod cli;
mod config;
mod envsensord;
pub mod i2c;
pub mod lightsensor;
pub mod metrics;
#[cfg(test)]
mod test_utils;
mod util;
