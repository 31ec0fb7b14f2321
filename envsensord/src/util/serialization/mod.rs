//
// Copyright (c) Memfault, Inc.
// See License.txt for details
pub mod optional_integer_expression;
pub mod seconds_to_duration;
