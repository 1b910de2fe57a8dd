// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Component B: the parameter projector. Maps a persisted login-parameter
//! record onto a typed [`SetRequest`] the transport engine can apply.
//!
//! The catalogue mirrors the login-negotiation parameter groups the
//! transport layer this core drives actually negotiates: header/data digest,
//! receive/burst sizing, write-side flow control, PDU/sequence ordering,
//! error recovery level, negotiation timers and the connection cap.

use std::fmt;

use crate::error::{DiscoveryError, Result};

/// Digest algorithm, mirroring the two values the wire protocol supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Digest {
    None,
    Crc32c,
}

/// The full set of catalogued login parameters, as currently held (either
/// from the persisted per-target override or the negotiated default).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoginParams {
    pub header_digest: Digest,
    pub data_digest: Digest,
    pub data_pdu_in_order: bool,
    pub data_sequence_in_order: bool,
    pub error_recovery_level: u8,
    pub first_burst_length: u32,
    pub max_burst_length: u32,
    pub max_recv_data_segment_length: u32,
    pub immediate_data: bool,
    pub initial_r2t: bool,
    pub max_outstanding_r2t: u8,
    pub max_connections: u16,
    pub default_time2retain: u32,
    pub default_time2wait: u32,
}

/// Identifies a single catalogued parameter by wire-key name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    HeaderDigest,
    DataDigest,
    DataPduInOrder,
    DataSequenceInOrder,
    ErrorRecoveryLevel,
    FirstBurstLength,
    MaxBurstLength,
    MaxRecvDataSegmentLength,
    ImmediateData,
    InitialR2T,
    MaxOutstandingR2T,
    MaxConnections,
    DefaultTime2Retain,
    DefaultTime2Wait,
}

impl ParamId {
    /// The wire-key name, used both for `Display` and for parsing a
    /// persisted override record's parameter name back into a `ParamId`.
    pub fn name(self) -> &'static str {
        match self {
            ParamId::HeaderDigest => "HeaderDigest",
            ParamId::DataDigest => "DataDigest",
            ParamId::DataPduInOrder => "DataPDUInOrder",
            ParamId::DataSequenceInOrder => "DataSequenceInOrder",
            ParamId::ErrorRecoveryLevel => "ErrorRecoveryLevel",
            ParamId::FirstBurstLength => "FirstBurstLength",
            ParamId::MaxBurstLength => "MaxBurstLength",
            ParamId::MaxRecvDataSegmentLength => "MaxRecvDataSegmentLength",
            ParamId::ImmediateData => "ImmediateData",
            ParamId::InitialR2T => "InitialR2T",
            ParamId::MaxOutstandingR2T => "MaxOutstandingR2T",
            ParamId::MaxConnections => "MaxConnections",
            ParamId::DefaultTime2Retain => "DefaultTime2Retain",
            ParamId::DefaultTime2Wait => "DefaultTime2Wait",
        }
    }

    /// Every catalogued parameter, for callers that loop over the override
    /// bitmap one bit at a time.
    pub const ALL: [ParamId; 14] = [
        ParamId::HeaderDigest,
        ParamId::DataDigest,
        ParamId::DataPduInOrder,
        ParamId::DataSequenceInOrder,
        ParamId::ErrorRecoveryLevel,
        ParamId::FirstBurstLength,
        ParamId::MaxBurstLength,
        ParamId::MaxRecvDataSegmentLength,
        ParamId::ImmediateData,
        ParamId::InitialR2T,
        ParamId::MaxOutstandingR2T,
        ParamId::MaxConnections,
        ParamId::DefaultTime2Retain,
        ParamId::DefaultTime2Wait,
    ];

    /// The three integers the transport engine does not currently accept a
    /// runtime `set_params` for, even though they are catalogued.
    fn is_currently_unsettable(self) -> bool {
        matches!(
            self,
            ParamId::MaxConnections
                | ParamId::MaxOutstandingR2T
                | ParamId::ErrorRecoveryLevel
        )
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ParamId {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ParamId::ALL.into_iter().find(|p| p.name() == s).ok_or(())
    }
}

/// Either half of the typed value a [`SetRequest`] carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(u32),
}

/// The projected set-request the transport engine's `set_params` consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetRequest {
    pub param: ParamId,
    pub value: ParamValue,
}

/// Projects `param` out of `params` into a typed [`SetRequest`].
///
/// Fails with [`DiscoveryError::Unsupported`] for the three currently
/// unsettable integers (`MaxConnections`, `MaxOutstandingR2T`,
/// `ErrorRecoveryLevel`); every other catalogued parameter projects its own
/// field (not, as in the handwritten predecessor of this code, a neighbor's).
pub fn project(param: ParamId, params: &LoginParams) -> Result<SetRequest> {
    if param.is_currently_unsettable() {
        return Err(DiscoveryError::Unsupported(param.name().to_string()));
    }

    let value = match param {
        ParamId::HeaderDigest => {
            ParamValue::Bool(matches!(params.header_digest, Digest::Crc32c))
        },
        ParamId::DataDigest => {
            ParamValue::Bool(matches!(params.data_digest, Digest::Crc32c))
        },
        ParamId::DataPduInOrder => ParamValue::Bool(params.data_pdu_in_order),
        ParamId::DataSequenceInOrder => ParamValue::Bool(params.data_sequence_in_order),
        ParamId::FirstBurstLength => ParamValue::Int(params.first_burst_length),
        ParamId::MaxBurstLength => ParamValue::Int(params.max_burst_length),
        ParamId::MaxRecvDataSegmentLength => {
            ParamValue::Int(params.max_recv_data_segment_length)
        },
        ParamId::ImmediateData => ParamValue::Bool(params.immediate_data),
        ParamId::InitialR2T => ParamValue::Bool(params.initial_r2t),
        ParamId::DefaultTime2Retain => ParamValue::Int(params.default_time2retain),
        ParamId::DefaultTime2Wait => ParamValue::Int(params.default_time2wait),
        ParamId::MaxConnections | ParamId::MaxOutstandingR2T | ParamId::ErrorRecoveryLevel => {
            unreachable!("filtered out above")
        },
    };

    Ok(SetRequest { param, value })
}

/// Parses a persisted parameter name into a [`ParamId`], for record formats
/// that may name parameters outside the catalogue.
pub fn parse_param_name(name: &str) -> Result<ParamId> {
    name.parse()
        .map_err(|()| DiscoveryError::Unsupported(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_params() -> LoginParams {
        LoginParams {
            header_digest: Digest::Crc32c,
            data_digest: Digest::None,
            data_pdu_in_order: true,
            data_sequence_in_order: false,
            error_recovery_level: 0,
            first_burst_length: 65536,
            max_burst_length: 262144,
            max_recv_data_segment_length: 131072,
            immediate_data: true,
            initial_r2t: false,
            max_outstanding_r2t: 1,
            max_connections: 1,
            default_time2retain: 20,
            default_time2wait: 2,
        }
    }

    #[test]
    fn unsettable_integers_are_rejected() {
        let params = sample_params();
        for id in [
            ParamId::MaxConnections,
            ParamId::MaxOutstandingR2T,
            ParamId::ErrorRecoveryLevel,
        ] {
            assert!(matches!(
                project(id, &params),
                Err(DiscoveryError::Unsupported(_))
            ));
        }
    }

    #[test]
    fn catalogued_booleans_round_trip() {
        let params = sample_params();
        let cases = [
            (ParamId::DataPduInOrder, params.data_pdu_in_order),
            (
                ParamId::DataSequenceInOrder,
                params.data_sequence_in_order,
            ),
            (ParamId::ImmediateData, params.immediate_data),
            (ParamId::InitialR2T, params.initial_r2t),
        ];
        for (id, expected) in cases {
            let req = project(id, &params).expect("settable param");
            assert_eq!(req.value, ParamValue::Bool(expected));
        }
    }

    #[test]
    fn ordering_flags_do_not_alias_each_other() {
        // Regression for the upstream typo where both ordering flags read
        // the same field: flipping one must not move the other.
        let mut params = sample_params();
        params.data_pdu_in_order = true;
        params.data_sequence_in_order = false;

        let pdu = project(ParamId::DataPduInOrder, &params).expect("settable");
        let seq = project(ParamId::DataSequenceInOrder, &params).expect("settable");
        assert_eq!(pdu.value, ParamValue::Bool(true));
        assert_eq!(seq.value, ParamValue::Bool(false));
    }

    #[test]
    fn unknown_name_is_unsupported() {
        assert!(parse_param_name("NotARealParam").is_err());
    }

    #[test]
    fn stamped_param_matches_request() {
        let params = sample_params();
        let req = project(ParamId::MaxBurstLength, &params).expect("settable");
        assert_eq!(req.param, ParamId::MaxBurstLength);
    }
}
