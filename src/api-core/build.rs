// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Captures the compiler version for the `x-goog-api-client` header.

use std::io::Write;
use std::path::PathBuf;

fn main() {
    let out_dir = std::env::var_os("OUT_DIR").expect("OUT_DIR is always set by cargo");
    let rustc = rustc_version::version().expect("cannot determine the rustc version");
    let contents = format!("pub(crate) const RUSTC_VERSION: &str = \"{rustc}\";\n");

    let mut file = std::fs::File::create(PathBuf::from(out_dir).join("build_env.rs"))
        .expect("cannot create build_env.rs");
    file.write_all(contents.as_bytes())
        .expect("cannot write build_env.rs");
    println!("cargo::rerun-if-changed=build.rs");
}
