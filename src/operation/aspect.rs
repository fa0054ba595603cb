use bitflags::bitflags;

bitflags! {
    /// Capabilities shared by every operation of a given kind.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Aspects: u8 {
        /// The operation reads data and may be routed by read preference.
        const READ_OPERATION          = 0b0000_0001;
        /// The operation writes data and carries a write concern.
        const WRITE_OPERATION         = 0b0000_0010;
        /// The operation may be attempted a second time.
        const RETRYABLE               = 0b0000_0100;
        /// The operation can be wrapped in an `explain` command.
        const EXPLAINABLE             = 0b0000_1000;
        /// The collation is attached to each statement instead of the command root.
        const SKIP_COLLATION          = 0b0001_0000;
        /// The reply describes a server-side cursor.
        const CURSOR_CREATING         = 0b0010_0000;
        /// The operation continues work started on one server and must run there.
        const MUST_SELECT_SAME_SERVER = 0b0100_0000;
    }
}

/// The kinds of operations the executor can run. Displays as the server command name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
#[non_exhaustive]
pub enum OperationKind {
    /// `find`
    #[display("find")]
    Find,
    /// `getMore`
    #[display("getMore")]
    GetMore,
    /// `killCursors`
    #[display("killCursors")]
    KillCursors,
    /// `aggregate`
    #[display("aggregate")]
    Aggregate,
    /// `count`
    #[display("count")]
    Count,
    /// `distinct`
    #[display("distinct")]
    Distinct,
    /// `insert`
    #[display("insert")]
    Insert,
    /// `update`
    #[display("update")]
    Update,
    /// `delete`
    #[display("delete")]
    Delete,
    /// `findAndModify`
    #[display("findAndModify")]
    FindAndModify,
    /// `listCollections`
    #[display("listCollections")]
    ListCollections,
    /// `listDatabases`
    #[display("listDatabases")]
    ListDatabases,
    /// `drop`
    #[display("drop")]
    DropCollection,
    /// An arbitrary command document.
    #[display("runCommand")]
    RunCommand,
}

impl OperationKind {
    /// The capabilities of every operation of this kind.
    pub const fn aspects(self) -> Aspects {
        use Aspects as A;

        match self {
            Self::Find | Self::Aggregate => A::READ_OPERATION
                .union(A::RETRYABLE)
                .union(A::EXPLAINABLE)
                .union(A::CURSOR_CREATING),
            Self::GetMore => A::READ_OPERATION.union(A::MUST_SELECT_SAME_SERVER),
            Self::KillCursors => A::MUST_SELECT_SAME_SERVER,
            Self::Count | Self::ListDatabases => A::READ_OPERATION.union(A::RETRYABLE),
            Self::Distinct => A::READ_OPERATION
                .union(A::RETRYABLE)
                .union(A::EXPLAINABLE),
            Self::Insert => A::WRITE_OPERATION.union(A::RETRYABLE),
            Self::Update | Self::Delete => A::WRITE_OPERATION
                .union(A::RETRYABLE)
                .union(A::EXPLAINABLE)
                .union(A::SKIP_COLLATION),
            Self::FindAndModify => A::WRITE_OPERATION
                .union(A::RETRYABLE)
                .union(A::EXPLAINABLE),
            Self::ListCollections => A::READ_OPERATION
                .union(A::RETRYABLE)
                .union(A::CURSOR_CREATING),
            Self::DropCollection => A::WRITE_OPERATION,
            Self::RunCommand => A::empty(),
        }
    }

    /// Whether operations of this kind have the given aspect.
    pub const fn has_aspect(self, aspect: Aspects) -> bool {
        self.aspects().contains(aspect)
    }

    /// Whether operations of this kind accept a `readConcern` at the command root.
    pub(crate) const fn accepts_read_concern(self) -> bool {
        matches!(
            self,
            Self::Find | Self::Aggregate | Self::Count | Self::Distinct
        )
    }

    /// The name of the server command run by operations of this kind.
    pub const fn command_name(self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::GetMore => "getMore",
            Self::KillCursors => "killCursors",
            Self::Aggregate => "aggregate",
            Self::Count => "count",
            Self::Distinct => "distinct",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::FindAndModify => "findAndModify",
            Self::ListCollections => "listCollections",
            Self::ListDatabases => "listDatabases",
            Self::DropCollection => "drop",
            Self::RunCommand => "runCommand",
        }
    }
}
