/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 Arsenal Project contributors. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 */
use std::hash::Hash;

pub mod cmd;

pub fn has_duplicates<T>(iter: T) -> bool
where
    T: IntoIterator,
    T::Item: Eq + Hash,
{
    let mut uniq = std::collections::HashSet::new();
    !iter.into_iter().all(move |x| uniq.insert(x))
}
