//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use envsensord::cli;

fn main() {
    cli::main()
}
