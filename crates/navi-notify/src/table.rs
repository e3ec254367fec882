//! Closed sets of tables, channels and row operations.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

macro_rules! table_names {
    ($($variant:ident => $name:literal,)+) => {
        /// A database table that emits change notifications.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum TableName {
            $(
                #[doc = $name]
                $variant,
            )+
        }

        impl TableName {
            /// Every table, in declaration order.
            pub const ALL: &'static [TableName] = &[$(TableName::$variant,)+];

            /// The SQL table name.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(TableName::$variant => $name,)+
                }
            }

            /// Looks up a table by its SQL name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(TableName::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

table_names! {
    Comments => "bn_comments",
    TypeInstances => "bn_type_instances",
    ExpressionTypeInstances => "bn_expression_type_instances",
    ExpressionTypes => "bn_expression_types",
    TypeMembers => "bn_types",
    BaseTypes => "bn_base_types",
    Edges => "bn_edges",
    GlobalEdgeComments => "bn_global_edge_comments",
    CodeNodes => "bn_code_nodes",
    GlobalNodeComments => "bn_global_node_comments",
    CodeNodeInstructions => "bn_codenode_instructions",
    Instructions => "bn_instructions",
    FunctionNodes => "bn_function_nodes",
    Functions => "bn_functions",
    TextNodes => "bn_text_nodes",
    GroupNodes => "bn_group_nodes",
    Views => "bn_views",
    ModuleViews => "bn_module_views",
    ProjectViews => "bn_project_views",
}

impl TableName {
    /// Splits the table name off a notification line.
    pub fn of_line(line: &str) -> Option<Self> {
        line.split_whitespace().next().and_then(Self::from_name)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A LISTEN/NOTIFY channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Channel {
    Views,
    Functions,
    Comments,
    Types,
    TypeInstances,
}

impl Channel {
    /// Every channel, in the order a poll dispatches them.
    pub const ALL: [Channel; 5] = [
        Channel::Views,
        Channel::Functions,
        Channel::Comments,
        Channel::Types,
        Channel::TypeInstances,
    ];

    /// The channel name used with LISTEN.
    pub fn name(self) -> &'static str {
        match self {
            Channel::Views => "view_changes",
            Channel::Functions => "function_changes",
            Channel::Comments => "comment_changes",
            Channel::Types => "types_changes",
            Channel::TypeInstances => "type_instances_changes",
        }
    }

    /// Looks up a channel by name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    /// Returns `true` if notifications for `table` arrive on this channel.
    pub fn carries(self, table: TableName) -> bool {
        use TableName as T;
        match self {
            Channel::Views => matches!(table, T::Views | T::ModuleViews | T::ProjectViews),
            Channel::Functions => table == T::Functions,
            Channel::Types => matches!(table, T::BaseTypes | T::TypeMembers | T::ExpressionTypes),
            Channel::TypeInstances => {
                matches!(table, T::TypeInstances | T::ExpressionTypeInstances)
            }
            Channel::Comments => matches!(
                table,
                T::Comments
                    | T::TypeInstances
                    | T::Edges
                    | T::GlobalEdgeComments
                    | T::CodeNodes
                    | T::GlobalNodeComments
                    | T::CodeNodeInstructions
                    | T::Instructions
                    | T::FunctionNodes
                    | T::Functions
                    | T::TextNodes
                    | T::GroupNodes
            ),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown channel '{s}'"))
    }
}

/// The row operation that triggered a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    /// Parses the operation token as the database writes it.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "INSERT" => Some(Operation::Insert),
            "UPDATE" => Some(Operation::Update),
            "DELETE" => Some(Operation::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        })
    }
}

// ── tests ───────────────────────────────────────────────────────────
