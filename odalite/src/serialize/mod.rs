// Copyright (c) 2025-2026 Odalite Contributors.
// SPDX-License-Identifier: Apache-2.0
//
//! Value model, protocol-text rendering, and the parameter accumulator

pub mod value;
pub mod writer;

pub use self::value::{
    DateParts, DateTimeParts, DateTimeValue, DateValue, DurationParts, DurationValue, EnumValue,
    TimeParts, TimeValue, Value,
};
pub use self::writer::{render_query, ParamBinding};
