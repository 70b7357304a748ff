//! Prelude to simplify downstream use of APDU objects
//!

pub use crate::{
    card::{AcceptableCards, CardInfo, FamilyId, SelectAppletReq},
    challenge::{ChallengeResp, GetChallengeReq, VerifyChallengeReq},
    data::TlvResp,
    inheritance::{InheritanceMode, InheritanceReq},
    pair::{PairReq, UnpairReq},
    sign::EcdsaReq,
    status::{ContinuationReq, StatusWord},
    wallet::{
        AddWalletReq, DeleteWalletReq, ListWalletReq, RetrieveWalletReq, WalletEntry, WalletInfo,
        WalletList, WalletLookup, WalletSummary,
    },
    ApduError, ApduReq, ApduStatic, Instruction,
};
