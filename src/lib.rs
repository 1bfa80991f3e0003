// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod budget;
pub mod classifier;
pub mod cli;
pub mod commands;
pub mod db;
pub mod dedup;
pub mod errors;
pub mod ingest;
pub mod models;
pub mod normalizer;
pub mod rates;
pub mod reimburse;
pub mod savings;
pub mod utils;
