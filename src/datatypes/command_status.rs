use num_enum::TryFromPrimitive;

/// The command_status field of an SMPP response reports the success or failure
/// of the request it answers. Requests always carry `Ok` (NULL).
///
/// Only the codes a session endpoint produces or reacts to are named here;
/// anything else a peer sends is folded into [`CommandStatus::UnknownError`]
/// by [`CommandStatus::from_wire`].
#[derive(TryFromPrimitive)]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CommandStatus {
    /// ESME_ROK
    Ok = 0x0000_0000,
    /// ESME_RINVMSGLEN
    InvalidMsgLength = 0x0000_0001,
    /// ESME_RINVCMDLEN
    InvalidCommandLength = 0x0000_0002,
    /// ESME_RINVCMDID
    InvalidCommandId = 0x0000_0003,
    /// ESME_RINVBNDSTS: incorrect bind status for given command
    IncorrectBindStatus = 0x0000_0004,
    /// ESME_RALYBND
    AlreadyBoundState = 0x0000_0005,
    /// ESME_RSYSERR
    SystemError = 0x0000_0008,
    /// ESME_RINVSRCADR
    InvalidSourceAddress = 0x0000_000A,
    /// ESME_RINVDSTADR
    InvalidDestinationAddress = 0x0000_000B,
    /// ESME_RINVMSGID
    InvalidMessageId = 0x0000_000C,
    /// ESME_RBINDFAIL
    BindFailed = 0x0000_000D,
    /// ESME_RINVPASWD
    InvalidPassword = 0x0000_000E,
    /// ESME_RINVSYSID
    InvalidSystemId = 0x0000_000F,
    /// ESME_RMSGQFUL
    MessageQueueFull = 0x0000_0014,
    /// ESME_RINVSERTYP
    InvalidServiceType = 0x0000_0015,
    /// ESME_RINVESMCLASS
    InvalidEsmClassFieldData = 0x0000_0043,
    /// ESME_RSUBMITFAIL
    SubmitFailed = 0x0000_0045,
    /// ESME_RINVSRCTON
    InvalidSourceAddrTon = 0x0000_0048,
    /// ESME_RINVSRCNPI
    InvalidSourceAddrNpi = 0x0000_0049,
    /// ESME_RINVDSTTON
    InvalidDestAddrTon = 0x0000_0050,
    /// ESME_RINVDSTNPI
    InvalidDestAddrNpi = 0x0000_0051,
    /// ESME_RINVSYSTYP
    InvalidSystemType = 0x0000_0053,
    /// ESME_RTHROTTLED
    ThrottlingError = 0x0000_0058,
    /// ESME_RX_T_APPN: receiver temporary application error
    ReceiverTemporaryAppError = 0x0000_0064,
    /// ESME_RX_P_APPN: receiver permanent application error
    ReceiverPermanentAppError = 0x0000_0065,
    /// ESME_RX_R_APPN: receiver reject message error
    ReceiverRejectMessageError = 0x0000_0066,
    /// ESME_RUNKNOWNERR
    UnknownError = 0x0000_00FF,
}

impl CommandStatus {
    /// Map a raw wire value, folding unnamed and vendor specific codes into
    /// `UnknownError`.
    pub fn from_wire(value: u32) -> Self {
        CommandStatus::try_from(value).unwrap_or(CommandStatus::UnknownError)
    }

    pub fn is_ok(&self) -> bool {
        *self == CommandStatus::Ok
    }
}
