// Copyright (c) Billfold contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod budgets;
pub mod categories;
pub mod config;
pub mod importer;
pub mod income;
pub mod patterns;
pub mod rates;
pub mod reimburse;
pub mod savings;
pub mod templates;
pub mod transactions;
