// SPDX-License-Identifier: MIT

pub mod roster;
