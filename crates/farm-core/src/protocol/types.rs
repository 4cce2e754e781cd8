//! Closed catalog of protocol message types.
//!
//! Every type has a pinned numeric code. Codes are part of the wire format:
//! new types are appended before the terminal sentinel and existing codes are
//! never renumbered. The catalog is split into two bands:
//!
//! ```text
//! 0 ..  47   control types (no payload, the header int is a plain value)
//! 47 .. 219  data types    (payload present, header int is its length)
//! ```
//!
//! The first three control codes are reserved for the envelope itself:
//! `TNULL`, `TVersionMismatch`, and `TInvalid`.

use std::fmt;

use crate::protocol::error::WireError;

/// Defines [`MessageType`] with explicit discriminants plus its name table.
macro_rules! message_types {
    ($($(#[$meta:meta])* $variant:ident = $code:literal => $name:literal,)+) => {
        /// A protocol message type with its pinned wire code.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(i32)]
        pub enum MessageType {
            $($(#[$meta])* $variant = $code,)+
        }

        impl MessageType {
            /// Every type in code order.
            pub const ALL: &'static [MessageType] = &[$(MessageType::$variant,)+];

            /// The diagnostic name used by the protocol (e.g. `"TTaskUpdateState"`).
            pub const fn name(self) -> &'static str {
                match self {
                    $(MessageType::$variant => $name,)+
                }
            }
        }

        impl TryFrom<i32> for MessageType {
            type Error = WireError;

            fn try_from(code: i32) -> Result<Self, WireError> {
                match code {
                    $($code => Ok(MessageType::$variant),)+
                    other => Err(WireError::UnknownType(other)),
                }
            }
        }
    };
}

message_types! {
    /// Default type of a new envelope. Only this type may be replaced by a `set_*` call.
    Null = 0 => "TNULL",
    /// Set by the receiver when the sender runs another protocol version.
    VersionMismatch = 1 => "TVersionMismatch",
    /// Set on construction or reception when the message cannot be trusted.
    Invalid = 2 => "TInvalid",
    /// Plain acknowledgement with no data.
    Confirm = 3 => "TConfirm",
    StatRequest = 4 => "TStatRequest",
    ConfigLoad = 5 => "TConfigLoad",
    FarmLoad = 6 => "TFarmLoad",
    ClientExitRequest = 7 => "TClientExitRequest",
    ClientRestartRequest = 8 => "TClientRestartRequest",
    ClientWOLSleepRequest = 9 => "TClientWOLSleepRequest",
    ClientRebootRequest = 10 => "TClientRebootRequest",
    ClientShutdownRequest = 11 => "TClientShutdownRequest",
    TalkId = 12 => "TTalkId",
    TalkUpdateId = 13 => "TTalkUpdateId",
    TalksListRequest = 14 => "TTalksListRequest",
    TalkDeregister = 15 => "TTalkDeregister",
    MonitorId = 16 => "TMonitorId",
    MonitorUpdateId = 17 => "TMonitorUpdateId",
    MonitorsListRequest = 18 => "TMonitorsListRequest",
    MonitorDeregister = 19 => "TMonitorDeregister",
    RenderId = 20 => "TRenderId",
    RendersListRequest = 21 => "TRendersListRequest",
    RenderLogRequestId = 22 => "TRenderLogRequestId",
    RenderTasksLogRequestId = 23 => "TRenderTasksLogRequestId",
    RenderInfoRequestId = 24 => "TRenderInfoRequestId",
    RenderDeregister = 25 => "TRenderDeregister",
    UsersListRequest = 26 => "TUsersListRequest",
    UserId = 27 => "TUserId",
    UserLogRequestId = 28 => "TUserLogRequestId",
    UserJobsOrderRequestId = 29 => "TUserJobsOrderRequestId",
    JobsListRequest = 30 => "TJobsListRequest",
    JobsListRequestUserId = 31 => "TJobsListRequestUserId",
    JobLogRequestId = 32 => "TJobLogRequestId",
    JobErrorHostsRequestId = 33 => "TJobErrorHostsRequestId",
    JobsWeightRequest = 34 => "TJobsWeightRequest",
    JobRequestId = 35 => "TJobRequestId",
    JobProgressRequestId = 36 => "TJobProgressRequestId",
    Reserved00 = 37 => "TRESERVED00",
    Reserved01 = 38 => "TRESERVED01",
    Reserved02 = 39 => "TRESERVED02",
    Reserved03 = 40 => "TRESERVED03",
    Reserved04 = 41 => "TRESERVED04",
    Reserved05 = 42 => "TRESERVED05",
    Reserved06 = 43 => "TRESERVED06",
    Reserved07 = 44 => "TRESERVED07",
    Reserved08 = 45 => "TRESERVED08",
    Reserved09 = 46 => "TRESERVED09",
    // ── Data messages ──
    /// First data-bearing type: an opaque blob.
    Data = 47 => "TDATA",
    TestData = 48 => "TTESTDATA",
    /// A single text string.
    String = 49 => "TString",
    /// A list of text strings.
    StringList = 50 => "TStringList",
    StatData = 51 => "TStatData",
    TalkRegister = 52 => "TTalkRegister",
    TalksListRequestIds = 53 => "TTalksListRequestIds",
    TalksList = 54 => "TTalksList",
    TalkDistributeData = 55 => "TTalkDistributeData",
    TalkData = 56 => "TTalkData",
    TalkExit = 57 => "TTalkExit",
    MonitorRegister = 58 => "TMonitorRegister",
    MonitorsListRequestIds = 59 => "TMonitorsListRequestIds",
    MonitorsList = 60 => "TMonitorsList",
    MonitorSubscribe = 61 => "TMonitorSubscribe",
    MonitorUnsubscribe = 62 => "TMonitorUnsubscribe",
    MonitorUsersJobs = 63 => "TMonitorUsersJobs",
    MonitorJobsIdsAdd = 64 => "TMonitorJobsIdsAdd",
    MonitorJobsIdsSet = 65 => "TMonitorJobsIdsSet",
    MonitorJobsIdsDel = 66 => "TMonitorJobsIdsDel",
    /// Text forwarded to monitors.
    MonitorMessage = 67 => "TMonitorMessage",
    MonitorExit = 68 => "TMonitorExit",
    MonitorEventsBegin = 69 => "TMonitorEvents_BEGIN",
    MonitorJobEventsBegin = 70 => "TMonitorJobEvents_BEGIN",
    MonitorJobsAdd = 71 => "TMonitorJobsAdd",
    MonitorJobsChanged = 72 => "TMonitorJobsChanged",
    MonitorJobsDel = 73 => "TMonitorJobsDel",
    MonitorJobEventsEnd = 74 => "TMonitorJobEvents_END",
    MonitorCommonEventsBegin = 75 => "TMonitorCommonEvents_BEGIN",
    MonitorUsersAdd = 76 => "TMonitorUsersAdd",
    MonitorUsersChanged = 77 => "TMonitorUsersChanged",
    MonitorUsersDel = 78 => "TMonitorUsersDel",
    MonitorRendersAdd = 79 => "TMonitorRendersAdd",
    MonitorRendersChanged = 80 => "TMonitorRendersChanged",
    MonitorRendersDel = 81 => "TMonitorRendersDel",
    MonitorMonitorsAdd = 82 => "TMonitorMonitorsAdd",
    MonitorMonitorsChanged = 83 => "TMonitorMonitorsChanged",
    MonitorMonitorsDel = 84 => "TMonitorMonitorsDel",
    MonitorTalksAdd = 85 => "TMonitorTalksAdd",
    MonitorTalksDel = 86 => "TMonitorTalksDel",
    MonitorCommonEventsEnd = 87 => "TMonitorCommonEvents_END",
    MonitorEventsEnd = 88 => "TMonitorEvents_END",
    RenderRegister = 89 => "TRenderRegister",
    RenderUpdate = 90 => "TRenderUpdate",
    RendersListRequestIds = 91 => "TRendersListRequestIds",
    RendersUpdateRequestIds = 92 => "TRendersUpdateRequestIds",
    RendersList = 93 => "TRendersList",
    RendersListUpdates = 94 => "TRendersListUpdates",
    RenderSetPriority = 95 => "TRenderSetPriority",
    RenderSetCapacity = 96 => "TRenderSetCapacity",
    RenderSetMaxTasks = 97 => "TRenderSetMaxTasks",
    RenderSetService = 98 => "TRenderSetService",
    RenderRestoreDefaults = 99 => "TRenderRestoreDefaults",
    RenderSetNIMBY = 100 => "TRenderSetNIMBY",
    RenderSetUser = 101 => "TRenderSetUser",
    RenderSetNimby = 102 => "TRenderSetNimby",
    RenderSetFree = 103 => "TRenderSetFree",
    RenderStopTask = 104 => "TRenderStopTask",
    RenderCloseTask = 105 => "TRenderCloseTask",
    RenderEject = 106 => "TRenderEject",
    RenderDelete = 107 => "TRenderDelete",
    RenderRestart = 108 => "TRenderRestart",
    RenderWOLSleep = 109 => "TRenderWOLSleep",
    RenderWOLWake = 110 => "TRenderWOLWake",
    RenderReboot = 111 => "TRenderReboot",
    RenderShutdown = 112 => "TRenderShutdown",
    RenderAnnotate = 113 => "TRenderAnnotate",
    RenderExit = 114 => "TRenderExit",
    UsersListRequestIds = 115 => "TUsersListRequestIds",
    UsersList = 116 => "TUsersList",
    UserAdd = 117 => "TUserAdd",
    UserDel = 118 => "TUserDel",
    UserJobsLifeTime = 119 => "TUserJobsLifeTime",
    UserHostsMask = 120 => "TUserHostsMask",
    UserHostsMaskExclude = 121 => "TUserHostsMaskExclude",
    UserMaxRunningTasks = 122 => "TUserMaxRunningTasks",
    UserPriority = 123 => "TUserPriority",
    UserErrorsAvoidHost = 124 => "TUserErrorsAvoidHost",
    UserErrorRetries = 125 => "TUserErrorRetries",
    UserErrorsTaskSameHost = 126 => "TUserErrorsTaskSameHost",
    UserErrorsForgiveTime = 127 => "TUserErrorsForgiveTime",
    UserIdRequest = 128 => "TUserIdRequest",
    UserMoveJobsUp = 129 => "TUserMoveJobsUp",
    UserMoveJobsDown = 130 => "TUserMoveJobsDown",
    UserMoveJobsTop = 131 => "TUserMoveJobsTop",
    UserMoveJobsBottom = 132 => "TUserMoveJobsBottom",
    UserJobsOrder = 133 => "TUserJobsOrder",
    UserAnnotate = 134 => "TUserAnnotate",
    JobRegister = 135 => "TJobRegister",
    JobStart = 136 => "TJobStart",
    JobStop = 137 => "TJobStop",
    JobRestart = 138 => "TJobRestart",
    JobRestartErrors = 139 => "TJobRestartErrors",
    JobResetErrorHosts = 140 => "TJobResetErrorHosts",
    JobPause = 141 => "TJobPause",
    JobRestartPause = 142 => "TJobRestartPause",
    JobDelete = 143 => "TJobDelete",
    JobsListRequestIds = 144 => "TJobsListRequestIds",
    JobsListRequestUsersIds = 145 => "TJobsListRequestUsersIds",
    JobsList = 146 => "TJobsList",
    JobProgress = 147 => "TJobProgress",
    JobHostsMask = 148 => "TJobHostsMask",
    JobHostsMaskExclude = 149 => "TJobHostsMaskExclude",
    JobDependMask = 150 => "TJobDependMask",
    JobDependMaskGlobal = 151 => "TJobDependMaskGlobal",
    JobMaxRunningTasks = 152 => "TJobMaxRunningTasks",
    JobMaxRunTasksPerHost = 153 => "TJobMaxRunTasksPerHost",
    JobWaitTime = 154 => "TJobWaitTime",
    JobLifeTime = 155 => "TJobLifeTime",
    JobPriority = 156 => "TJobPriority",
    JobNeedOS = 157 => "TJobNeedOS",
    JobNeedProperties = 158 => "TJobNeedProperties",
    JobsWeight = 159 => "TJobsWeight",
    JobCmdPost = 160 => "TJobCmdPost",
    JobAnnotate = 161 => "TJobAnnotate",
    Job = 162 => "TJob",
    BlockDependMask = 163 => "TBlockDependMask",
    BlockTasksDependMask = 164 => "TBlockTasksDependMask",
    BlockSubTaskDependMask = 165 => "TBlockSubTaskDependMask",
    BlockTasksMaxRunTime = 166 => "TBlockTasksMaxRunTime",
    BlockHostsMask = 167 => "TBlockHostsMask",
    BlockHostsMaskExclude = 168 => "TBlockHostsMaskExclude",
    BlockMaxRunningTasks = 169 => "TBlockMaxRunningTasks",
    BlockMaxRunTasksPerHost = 170 => "TBlockMaxRunTasksPerHost",
    BlockCommand = 171 => "TBlockCommand",
    BlockWorkingDir = 172 => "TBlockWorkingDir",
    BlockFiles = 173 => "TBlockFiles",
    BlockCmdPost = 174 => "TBlockCmdPost",
    BlockService = 175 => "TBlockService",
    BlockParser = 176 => "TBlockParser",
    BlockParserCoeff = 177 => "TBlockParserCoeff",
    BlockResetErrorHosts = 178 => "TBlockResetErrorHosts",
    BlockErrorsAvoidHost = 179 => "TBlockErrorsAvoidHost",
    BlockErrorRetries = 180 => "TBlockErrorRetries",
    BlockErrorsSameHost = 181 => "TBlockErrorsSameHost",
    BlockErrorsForgiveTime = 182 => "TBlockErrorsForgiveTime",
    BlockCapacity = 183 => "TBlockCapacity",
    BlockCapacityCoeffMin = 184 => "TBlockCapacityCoeffMin",
    BlockCapacityCoeffMax = 185 => "TBlockCapacityCoeffMax",
    BlockMultiHostMin = 186 => "TBlockMultiHostMin",
    BlockMultiHostMax = 187 => "TBlockMultiHostMax",
    BlockMultiHostWaitMax = 188 => "TBlockMultiHostWaitMax",
    BlockMultiHostWaitSrv = 189 => "TBlockMultiHostWaitSrv",
    BlockNeedMemory = 190 => "TBlockNeedMemory",
    BlockNeedPower = 191 => "TBlockNeedPower",
    BlockNeedHDD = 192 => "TBlockNeedHDD",
    BlockNeedProperties = 193 => "TBlockNeedProperties",
    BlocksProgress = 194 => "TBlocksProgress",
    BlocksProperties = 195 => "TBlocksProperties",
    Blocks = 196 => "TBlocks",
    Task = 197 => "TTask",
    TasksSkip = 198 => "TTasksSkip",
    TasksRestart = 199 => "TTasksRestart",
    TaskRequest = 200 => "TTaskRequest",
    TaskLogRequest = 201 => "TTaskLogRequest",
    TaskErrorHostsRequest = 202 => "TTaskErrorHostsRequest",
    TaskOutputRequest = 203 => "TTaskOutputRequest",
    /// Task progress update (percentage change).
    TaskUpdatePercent = 204 => "TTaskUpdatePercent",
    /// Task progress update (state change).
    TaskUpdateState = 205 => "TTaskUpdateState",
    TaskListenOutput = 206 => "TTaskListenOutput",
    TaskOutput = 207 => "TTaskOutput",
    TasksRun = 208 => "TTasksRun",
    Reserved10 = 209 => "TRESERVED10",
    Reserved11 = 210 => "TRESERVED11",
    Reserved12 = 211 => "TRESERVED12",
    Reserved13 = 212 => "TRESERVED13",
    Reserved14 = 213 => "TRESERVED14",
    Reserved15 = 214 => "TRESERVED15",
    Reserved16 = 215 => "TRESERVED16",
    Reserved17 = 216 => "TRESERVED17",
    Reserved18 = 217 => "TRESERVED18",
    Reserved19 = 218 => "TRESERVED19",
}

/// Name reported for codes outside the catalog.
pub const UNKNOWN_TYPE_NAME: &str = "!UNKNOWN!";

impl MessageType {
    /// Code of the first data-bearing type (`TDATA`).
    pub const DATA_BOUNDARY: i32 = 47;

    /// One past the last valid code (`TLAST`).
    pub const LAST: i32 = 219;

    /// The wire code.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Returns `true` for types that never carry a payload.
    pub const fn is_control(self) -> bool {
        self.code() < Self::DATA_BOUNDARY
    }

    /// Returns `true` for payload-bearing types.
    pub const fn is_data(self) -> bool {
        !self.is_control()
    }

    /// Returns `true` for `TNULL`, `TVersionMismatch`, and `TInvalid`.
    pub const fn is_reserved(self) -> bool {
        matches!(
            self,
            MessageType::Null | MessageType::VersionMismatch | MessageType::Invalid
        )
    }

    /// Classifies a raw code: `0 <= code < TDATA`.
    pub const fn is_control_code(code: i32) -> bool {
        code >= 0 && code < Self::DATA_BOUNDARY
    }

    /// Classifies a raw code: `TDATA <= code < TLAST`.
    pub const fn is_data_code(code: i32) -> bool {
        code >= Self::DATA_BOUNDARY && code < Self::LAST
    }

    /// Diagnostic name for a raw code, [`UNKNOWN_TYPE_NAME`] when out of range.
    pub fn name_of(code: i32) -> &'static str {
        MessageType::try_from(code).map_or(UNKNOWN_TYPE_NAME, MessageType::name)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
