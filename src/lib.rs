// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! In-memory model of WSJF test (UUT) and repair (UUR) reports: a tree of
//! sequence calls and measurement steps under one root, with json encoding
//! and decoding of the wire format.

pub mod report;
mod wsjf;
