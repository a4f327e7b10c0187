use types::BeaconStateError;

#[derive(Debug, PartialEq, Clone)]
pub enum BeaconChainError {
    /// No head has been set; the chain has not started.
    ChainNotStarted,
    /// The requested historical data is not in the archive.
    ArchiveMissing,
    BeaconState(BeaconStateError),
    Eth1(eth1::Error),
    /// The block receiver rejected the block outright.
    BlockProcessing(String),
}

impl From<BeaconStateError> for BeaconChainError {
    fn from(e: BeaconStateError) -> Self {
        BeaconChainError::BeaconState(e)
    }
}

impl From<eth1::Error> for BeaconChainError {
    fn from(e: eth1::Error) -> Self {
        BeaconChainError::Eth1(e)
    }
}
