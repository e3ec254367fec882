//! Type system notifications on `types_changes`.

use navi_core::{Address, BaseTypeId, ExpressionId, ModuleId, TypeMemberId};
use serde::Serialize;
use tracing::debug;

use crate::error::NotifyError;
use crate::grammar::{int, ops, seq, Grammar, ANY_OP};
use crate::operand::{locate, NodeIndex};
use crate::resolver::{DataLoader, ModelResolver, TypeSubstitution};
use crate::table::{Channel, Operation, TableName};

/// A parsed type notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TypeRecord {
    /// `bn_base_types`
    BaseType {
        operation: Operation,
        module: ModuleId,
        base_type: BaseTypeId,
    },
    /// `bn_types`
    Member {
        operation: Operation,
        module: ModuleId,
        member: TypeMemberId,
    },
    /// `bn_expression_types`
    Substitution {
        operation: Operation,
        module: ModuleId,
        address: Address,
        position: u32,
        expression: ExpressionId,
    },
}

impl TypeRecord {
    pub fn module(&self) -> ModuleId {
        match *self {
            TypeRecord::BaseType { module, .. }
            | TypeRecord::Member { module, .. }
            | TypeRecord::Substitution { module, .. } => module,
        }
    }

    fn operation(&self) -> Operation {
        match *self {
            TypeRecord::BaseType { operation, .. }
            | TypeRecord::Member { operation, .. }
            | TypeRecord::Substitution { operation, .. } => operation,
        }
    }
}

/// How a base type or member changes. Initialize and update load the
/// row when applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TypeChange {
    Initialize,
    Update,
    Remove,
}

impl From<Operation> for TypeChange {
    fn from(operation: Operation) -> Self {
        match operation {
            Operation::Insert => TypeChange::Initialize,
            Operation::Update => TypeChange::Update,
            Operation::Delete => TypeChange::Remove,
        }
    }
}

/// How the substitution of one operand node changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SubstitutionChange {
    Initialize(TypeSubstitution),
    Update(TypeSubstitution),
    Remove,
}

/// A resolved type change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeEvent {
    BaseType {
        module: ModuleId,
        base_type: BaseTypeId,
        change: TypeChange,
    },
    Member {
        module: ModuleId,
        member: TypeMemberId,
        change: TypeChange,
    },
    Substitution {
        module: ModuleId,
        address: Address,
        position: u32,
        expression: ExpressionId,
        /// Operand node carrying the substitution.
        node: NodeIndex,
        change: SubstitutionChange,
    },
}

/// Parser for the types channel.
#[derive(Debug, Clone)]
pub struct TypeParser {
    base_types: Grammar,
    members: Grammar,
    substitutions: Grammar,
}

impl TypeParser {
    pub fn new() -> Result<Self, NotifyError> {
        Ok(Self {
            base_types: Grammar::new(
                TableName::BaseTypes,
                &seq(&[ops(ANY_OP), int("module"), int("id")]),
            )?,
            members: Grammar::new(
                TableName::TypeMembers,
                &seq(&[ops(ANY_OP), int("module"), int("id")]),
            )?,
            substitutions: Grammar::new(
                TableName::ExpressionTypes,
                &seq(&[
                    ops(ANY_OP),
                    int("module"),
                    int("address"),
                    int("position"),
                    int("expression"),
                ]),
            )?,
        })
    }

    pub fn parse(&self, table: TableName, line: &str) -> Result<TypeRecord, NotifyError> {
        match table {
            TableName::BaseTypes => {
                let f = self.base_types.fields(line)?;
                Ok(TypeRecord::BaseType {
                    operation: f.operation()?,
                    module: f.get("module")?,
                    base_type: f.get("id")?,
                })
            }
            TableName::TypeMembers => {
                let f = self.members.fields(line)?;
                Ok(TypeRecord::Member {
                    operation: f.operation()?,
                    module: f.get("module")?,
                    member: f.get("id")?,
                })
            }
            TableName::ExpressionTypes => {
                let f = self.substitutions.fields(line)?;
                Ok(TypeRecord::Substitution {
                    operation: f.operation()?,
                    module: f.get("module")?,
                    address: f.get("address")?,
                    position: f.get("position")?,
                    expression: f.get("expression")?,
                })
            }
            other => Err(NotifyError::Unsupported {
                table: other.as_str(),
                channel: Channel::Types.name(),
            }),
        }
    }

    /// Substitutions are resolved to their operand node first; a
    /// substitution on an operand that is not loaded is skipped.
    pub fn resolve<M, L>(
        &self,
        record: &TypeRecord,
        model: &M,
        loader: &L,
    ) -> Result<Vec<TypeEvent>, NotifyError>
    where
        M: ModelResolver + ?Sized,
        L: DataLoader + ?Sized,
    {
        if !model.is_module_loaded(record.module()) {
            return Ok(Vec::new());
        }
        let change = TypeChange::from(record.operation());
        let event = match *record {
            TypeRecord::BaseType {
                module, base_type, ..
            } => TypeEvent::BaseType {
                module,
                base_type,
                change,
            },
            TypeRecord::Member { module, member, .. } => TypeEvent::Member {
                module,
                member,
                change,
            },
            TypeRecord::Substitution {
                module,
                address,
                position,
                expression,
                ..
            } => {
                let Some(node) = locate(model, module, address, position, expression) else {
                    debug!(%address, position, %expression, "operand node not loaded");
                    return Ok(Vec::new());
                };
                let change = match change {
                    TypeChange::Initialize => SubstitutionChange::Initialize(
                        loader.load_type_substitution(module, address, position, expression)?,
                    ),
                    TypeChange::Update => SubstitutionChange::Update(
                        loader.load_type_substitution(module, address, position, expression)?,
                    ),
                    TypeChange::Remove => SubstitutionChange::Remove,
                };
                TypeEvent::Substitution {
                    module,
                    address,
                    position,
                    expression,
                    node,
                    change,
                }
            }
        };
        Ok(vec![event])
    }
}
