//! Transfer manager state codes
//!
//! The transfer manager reports the progress of a transfer as a numeric
//! state code. Codes are shown verbatim in performance markers together
//! with a human-readable description.

/// State of a transfer inside the transfer manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TransferState {
    Initial = 0,
    WaitingForFileInfo = 1,
    ReceivedFileInfo = 2,
    WaitingForParentInfo = 3,
    ReceivedParentInfo = 4,
    WaitingForEntryCreation = 5,
    ReceivedEntryCreation = 6,
    WaitingForPoolInfo = 7,
    ReceivedPoolInfo = 8,
    WaitingFirstPoolReply = 9,
    ReceivedFirstPoolReply = 10,
    WaitingForSpaceInfo = 11,
    ReceivedSpaceInfo = 12,
    WaitingForEntryDelete = 13,
    ReceivedEntryDelete = 14,
    WaitingForCheckBeforeDelete = 15,
    ReceivedCheckBeforeDelete = 16,
    SentErrorReply = -1,
    SentSuccessReply = -2,
    /// The transfer manager has no record of the id (or could not be asked)
    UnknownId = -3,
}

impl TransferState {
    const ALL: [TransferState; 20] = [
        Self::Initial,
        Self::WaitingForFileInfo,
        Self::ReceivedFileInfo,
        Self::WaitingForParentInfo,
        Self::ReceivedParentInfo,
        Self::WaitingForEntryCreation,
        Self::ReceivedEntryCreation,
        Self::WaitingForPoolInfo,
        Self::ReceivedPoolInfo,
        Self::WaitingFirstPoolReply,
        Self::ReceivedFirstPoolReply,
        Self::WaitingForSpaceInfo,
        Self::ReceivedSpaceInfo,
        Self::WaitingForEntryDelete,
        Self::ReceivedEntryDelete,
        Self::WaitingForCheckBeforeDelete,
        Self::ReceivedCheckBeforeDelete,
        Self::SentErrorReply,
        Self::SentSuccessReply,
        Self::UnknownId,
    ];

    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.code() == code)
    }

    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Initial => "initialising",
            Self::WaitingForFileInfo => "waiting for file metadata",
            Self::ReceivedFileInfo => "received file metadata",
            Self::WaitingForParentInfo => "waiting for parent directory metadata",
            Self::ReceivedParentInfo => "received parent directory metadata",
            Self::WaitingForEntryCreation => "waiting for namespace entry creation",
            Self::ReceivedEntryCreation => "namespace entry created",
            Self::WaitingForPoolInfo => "waiting for pool selection",
            Self::ReceivedPoolInfo => "pool selected",
            Self::WaitingFirstPoolReply => "waiting for transfer to start",
            Self::ReceivedFirstPoolReply => "transfer running",
            Self::WaitingForSpaceInfo => "waiting for space reservation",
            Self::ReceivedSpaceInfo => "space reserved",
            Self::WaitingForEntryDelete => "waiting for namespace entry deletion",
            Self::ReceivedEntryDelete => "namespace entry deleted",
            Self::WaitingForCheckBeforeDelete => "checking entry before deletion",
            Self::ReceivedCheckBeforeDelete => "entry checked before deletion",
            Self::SentErrorReply => "failure reported",
            Self::SentSuccessReply => "success reported",
            Self::UnknownId => "unknown transfer",
        }
    }
}

/// Describe a raw state code, including codes this build does not know
#[must_use]
pub fn describe_state(code: i32) -> &'static str {
    TransferState::from_code(code).map_or("unrecognised state", TransferState::description)
}
