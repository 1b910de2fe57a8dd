// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The SLP discovery method: unimplemented. This stub exists solely so the
//! event barrier still sees a matched `start`/`end` pair for SLP every
//! cycle.

use std::sync::Arc;

use crate::{error::Result, hba::Hba};

pub async fn run_cycle(_hba: &Arc<Hba>) -> Result<()> {
    Ok(())
}
