use crate::{model::epoch::EpochState, processes::kos::is_below_kos_threshold};
use bobtail_consensus_core::{
    KType,
    blockhash::BlockHashExtensions,
    config::params::{KosParams, Params, SUBBLOCK_VERSION},
    errors::rule::{MalformedReason, RuleError, SubblockProcessResult},
    header::SubblockHeader,
    subblock::Subblock,
    tx::is_proofbase,
};
use bobtail_math::Uint256;
use bobtail_pow::{State as PowState, calc_pow};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Valid, carrying the rank computed from the proof of work
    Accepted(Uint256),
    /// Already linked or buffered
    Duplicate,
}

/// Context free subblock checks. Holds no state of its own, so any number of
/// workers may validate concurrently.
#[derive(Clone)]
pub struct SubblockValidator {
    k: KType,
    pow_state: PowState,
    weak_target: Uint256,
    strong_target: Uint256,
    kos: Option<KosParams>,
    skip_proof_of_work: bool,
}

impl SubblockValidator {
    pub fn new(params: &Params) -> Self {
        Self {
            k: params.bobtail_k,
            pow_state: PowState::new(params.weak_target()),
            weak_target: params.weak_target(),
            strong_target: params.strong_target(),
            kos: params.kos,
            skip_proof_of_work: params.skip_proof_of_work,
        }
    }

    /// Full admission check against a read-only view of the epoch. Parent existence
    /// is not checked here, it is the DAG processor's concern.
    pub fn validate(&self, subblock: &Subblock, epoch: &EpochState) -> SubblockProcessResult<ValidationOutcome> {
        if epoch.is_known(subblock.hash()) {
            return Ok(ValidationOutcome::Duplicate);
        }
        self.validate_in_isolation(subblock).map(ValidationOutcome::Accepted)
    }

    /// Structure and proof of work. Returns the rank on success.
    pub fn validate_in_isolation(&self, subblock: &Subblock) -> SubblockProcessResult<Uint256> {
        self.check_structure(subblock).map_err(|reason| RuleError::Malformed(subblock.hash(), reason))?;
        self.check_pow(&subblock.header)
    }

    pub fn check_structure(&self, subblock: &Subblock) -> Result<(), MalformedReason> {
        let header = &subblock.header;
        if header.parent.is_none() {
            return Err(MalformedReason::MissingParent);
        }
        if header.version != SUBBLOCK_VERSION {
            return Err(MalformedReason::UnknownVersion(header.version));
        }
        let txs = &subblock.txs.transactions;
        if txs.is_empty() {
            return Err(MalformedReason::EmptyTxSet);
        }
        let commitment = subblock.txs.commitment();
        if commitment != header.tx_commitment {
            return Err(MalformedReason::CommitmentMismatch { expected: commitment, found: header.tx_commitment });
        }
        if !is_proofbase(&txs[0]) {
            return Err(MalformedReason::MissingProofbase);
        }
        if let Some(index) = txs.iter().skip(1).position(|tx| is_proofbase(tx)) {
            return Err(MalformedReason::ExtraProofbase(index + 1));
        }
        Ok(())
    }

    pub fn check_pow(&self, header: &SubblockHeader) -> SubblockProcessResult<Uint256> {
        if self.skip_proof_of_work {
            return Ok(calc_pow(header.hash));
        }
        let (passed, pow) = self.pow_state.check_pow(header);
        if !passed {
            return Err(RuleError::InvalidProofOfWork(header.hash, pow, self.weak_target));
        }
        if let Some(kos) = &self.kos
            && !is_below_kos_threshold(pow, self.strong_target, self.k, kos)
        {
            return Err(RuleError::AboveKosThreshold(header.hash));
        }
        Ok(pow)
    }
}
