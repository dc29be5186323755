//! Pass 2: type checking over the bound tree.
//!
//! Every expression gets a type in `SemanticInfo::types`; every call gets a
//! resolved overload in `SemanticInfo::call_targets`. Calls are resolved
//! against the return type their context expects, which is why most visit
//! functions carry an `expected` type. The pass stops at the first error and
//! removes the builtin stubs from the symbol table when it is done.

use log::{debug, trace};

use crate::ast::*;
use crate::diagnostic::{DiagnosticEngine, SemanticError};
use crate::semantic::builtins;
use crate::semantic::operators::{binary_result, unary_result};
use crate::semantic::symbol_table::{FunctionSignature, ScopeId, SymbolKind, SymbolTable};
use crate::semantic::CallTarget;

/// Run pass 2, filling the type and call-target tables of `info`.
pub fn run_type_checker(ast: &Ast, diag: &mut DiagnosticEngine, symbol_table: &mut SymbolTable, info: &mut SemanticInfo) {
    let mut checker = TypeChecker {
        ast,
        symbol_table: &*symbol_table,
        info,
        current_return_type: Type::Void,
    };
    if let Err(error) = checker.check_unit(ast.get_root()) {
        debug!("TypeChecker: stopped at first error: {}", error);
        diag.report_error(error);
    }
    symbol_table.remove_builtin_functions();
}

struct TypeChecker<'a> {
    ast: &'a Ast,
    symbol_table: &'a SymbolTable,
    info: &'a mut SemanticInfo,
    current_return_type: Type,
}

impl<'a> TypeChecker<'a> {
    fn set_type(&mut self, node_ref: NodeRef, ty: &Type) {
        self.info.types[node_ref.index()] = Some(ty.clone());
    }

    fn scope_of(&self, node_ref: NodeRef) -> ScopeId {
        self.info.scope_of(node_ref).unwrap_or(ScopeId::GLOBAL)
    }

    fn check_unit(&mut self, root: NodeRef) -> Result<(), SemanticError> {
        let NodeKind::Unit(unit) = self.ast.get_kind(root) else {
            return Ok(());
        };
        for &global in &unit.globals {
            self.check_declaration(global)?;
        }
        for &record in &unit.records {
            if let Some(record) = self.ast.record(record) {
                record.fields.iter().try_for_each(|&field| self.check_declaration(field))?;
            }
        }
        for &function in &unit.functions {
            self.check_function(function)?;
        }
        Ok(())
    }

    /// A declared record type must name an existing record
    fn check_declaration(&mut self, decl_ref: NodeRef) -> Result<(), SemanticError> {
        let Some(decl) = self.ast.declaration(decl_ref) else {
            return Ok(());
        };
        if let Type::Record(name) = decl.ty.base_type()
            && self.symbol_table.lookup_record(*name).is_none()
        {
            return Err(SemanticError::UndefinedRecord {
                name: *name,
                location: self.ast.get_span(decl_ref),
            });
        }
        Ok(())
    }

    fn check_function(&mut self, func_ref: NodeRef) -> Result<(), SemanticError> {
        let Some(func) = self.ast.function(func_ref) else {
            return Ok(());
        };
        trace!("TypeChecker: function '{}'", func.name);
        if let Type::Record(name) = func.return_type.base_type()
            && self.symbol_table.lookup_record(*name).is_none()
        {
            return Err(SemanticError::UndefinedRecord {
                name: *name,
                location: self.ast.get_span(func_ref),
            });
        }

        func.params.iter().try_for_each(|&param| self.check_declaration(param))?;
        self.current_return_type = func.return_type.clone();
        func.body.iter().try_for_each(|&statement| self.check_statement(statement))
    }

    fn check_statement(&mut self, node_ref: NodeRef) -> Result<(), SemanticError> {
        let span = self.ast.get_span(node_ref);
        match self.ast.get_kind(node_ref) {
            NodeKind::Block(statements) => statements.iter().try_for_each(|&s| self.check_statement(s)),
            NodeKind::DeclarationStatement(decl) => self.check_declaration(*decl),
            NodeKind::Assignment(lhs, rhs) => {
                let expected = self.check_expression(*lhs, None)?;
                let found = self.check_expression(*rhs, Some(&expected))?;
                if found != expected {
                    return Err(SemanticError::AssignmentMismatch {
                        expected,
                        found,
                        location: span,
                    });
                }
                Ok(())
            }
            NodeKind::CallStatement(call) => self.check_expression(*call, None).map(|_| ()),
            NodeKind::If(stmt) => {
                self.check_condition("if", stmt.condition)?;
                self.check_statement(stmt.then_block)?;
                stmt.else_block.map_or(Ok(()), |else_block| self.check_statement(else_block))
            }
            NodeKind::While(stmt) => {
                self.check_condition("while", stmt.condition)?;
                self.check_statement(stmt.body)
            }
            NodeKind::Return(value) => {
                let expected = self.current_return_type.clone();
                let found = match value {
                    Some(value) => self.check_expression(*value, Some(&expected))?,
                    None => Type::Void,
                };
                if found != expected {
                    return Err(SemanticError::ReturnTypeMismatch {
                        expected,
                        found,
                        location: span,
                    });
                }
                Ok(())
            }
            NodeKind::EmptyStatement => Ok(()),
            _ => self.check_expression(node_ref, None).map(|_| ()),
        }
    }

    fn check_condition(&mut self, construct: &'static str, condition: NodeRef) -> Result<(), SemanticError> {
        let found = self.check_expression(condition, Some(&Type::Boolean))?;
        if found != Type::Boolean {
            return Err(SemanticError::ConditionNotBoolean {
                construct,
                found,
                location: self.ast.get_span(condition),
            });
        }
        Ok(())
    }

    /// Type of an expression node. `expected` is the type the context wants
    /// and only steers overload resolution of calls.
    fn check_expression(&mut self, node_ref: NodeRef, expected: Option<&Type>) -> Result<Type, SemanticError> {
        let location = self.ast.get_span(node_ref);
        let ty = match self.ast.get_kind(node_ref) {
            NodeKind::LiteralInt(_) => Type::Integer,
            NodeKind::LiteralString(_) => Type::String,
            NodeKind::LiteralBool(_) => Type::Boolean,
            NodeKind::Variable(name) => self.variable_type(node_ref, *name)?,
            NodeKind::FieldAccess(base, field) => {
                let base_type = self.check_expression(*base, None)?;
                let Type::Record(record) = base_type else {
                    return Err(SemanticError::NotARecord {
                        found: base_type,
                        location,
                    });
                };
                let fields = self
                    .symbol_table
                    .lookup_record(record)
                    .ok_or(SemanticError::UndefinedRecord { name: record, location })?;
                fields
                    .iter()
                    .find(|f| f.name == *field)
                    .map(|f| f.ty.clone())
                    .ok_or(SemanticError::UnknownField {
                        record,
                        field: *field,
                        location,
                    })?
            }
            NodeKind::ArrayAccess(base, index) => {
                let base_type = self.check_expression(*base, None)?;
                let Type::Array(element) = base_type else {
                    return Err(SemanticError::NotAnArray {
                        found: base_type,
                        location,
                    });
                };
                let index_type = self.check_expression(*index, Some(&Type::Integer))?;
                if index_type != Type::Integer {
                    return Err(SemanticError::InvalidIndex {
                        found: index_type,
                        location: self.ast.get_span(*index),
                    });
                }
                *element
            }
            NodeKind::UnaryOp(op, operand) => {
                let operand_type = self.check_expression(*operand, None)?;
                let result = unary_result(*op, &operand_type).ok_or_else(|| SemanticError::InvalidUnaryOp {
                    op: op.to_string(),
                    operand: operand_type,
                    location,
                })?;
                if op.is_increment_or_decrement() && !self.is_place(*operand) {
                    return Err(SemanticError::NotAssignable {
                        operation: format!("operand of '{op}'"),
                        location,
                    });
                }
                result
            }
            NodeKind::BinaryOp(op, left, right) => {
                let left_type = self.check_expression(*left, None)?;
                let right_type = self.check_expression(*right, None)?;
                binary_result(*op, &left_type, &right_type).ok_or(SemanticError::InvalidBinaryOp {
                    op: op.symbol(),
                    left: left_type,
                    right: right_type,
                    location,
                })?
            }
            NodeKind::Call(call) => self.check_call(node_ref, call, expected)?,
            _ => Type::Void,
        };
        self.set_type(node_ref, &ty);
        Ok(ty)
    }

    fn variable_type(&self, node_ref: NodeRef, name: NameId) -> Result<Type, SemanticError> {
        let location = self.ast.get_span(node_ref);
        let entry_ref = self
            .info
            .resolved_entry(node_ref)
            .ok_or(SemanticError::UndeclaredIdentifier { name, location })?;
        match &self.symbol_table.get_symbol_entry(entry_ref).kind {
            SymbolKind::Variable { ty, .. } => Ok(ty.clone()),
            _ => Err(SemanticError::NotAVariable { name, location }),
        }
    }

    /// Places are the only expressions that can be written to
    fn is_place(&self, node_ref: NodeRef) -> bool {
        matches!(
            self.ast.get_kind(node_ref),
            NodeKind::Variable(_) | NodeKind::FieldAccess(..) | NodeKind::ArrayAccess(..)
        )
    }

    /// Pick the first overload whose return type fits `expected` and whose
    /// parameter types equal the argument types pairwise.
    fn check_call(&mut self, node_ref: NodeRef, call: &CallExpr, expected: Option<&Type>) -> Result<Type, SemanticError> {
        let location = self.ast.get_span(node_ref);
        let overloads: Vec<FunctionSignature> = self
            .symbol_table
            .lookup_function(call.name, self.scope_of(node_ref))
            .map(<[FunctionSignature]>::to_vec)
            .unwrap_or_default();

        // Non-call arguments have one type whatever the overload; nested calls
        // are resolved per candidate against the parameter type.
        let mut argument_types = Vec::with_capacity(call.args.len());
        for &arg in &call.args {
            let ty = match self.ast.get_kind(arg) {
                NodeKind::Call(_) => None,
                _ => Some(self.check_expression(arg, None)?),
            };
            argument_types.push(ty);
        }

        let mut chosen = None;
        for candidate in &overloads {
            if candidate.params.len() != call.args.len() {
                continue;
            }
            if expected.is_some_and(|expected| *expected != candidate.return_type) {
                continue;
            }
            let mut matches = true;
            for ((&arg, arg_type), param) in call.args.iter().zip(&argument_types).zip(&candidate.params) {
                let fits = match arg_type {
                    Some(ty) => *ty == param.ty,
                    None => self
                        .check_expression(arg, Some(&param.ty))
                        .is_ok_and(|ty| ty == param.ty),
                };
                if !fits {
                    matches = false;
                    break;
                }
            }
            if matches {
                chosen = Some(candidate);
                break;
            }
        }

        let Some(signature) = chosen else {
            let arguments = self.describe_arguments(&call.args, &argument_types);
            return Err(SemanticError::NoMatchingFunction {
                name: call.name,
                arguments,
                location,
            });
        };

        for (&arg, param) in call.args.iter().zip(&signature.params) {
            if matches!(self.ast.get_kind(arg), NodeKind::Call(_)) {
                // settle the nested call on the overload chosen for this parameter
                self.check_expression(arg, Some(&param.ty))?;
            }
            if param.is_reference && !self.is_place(arg) {
                return Err(SemanticError::NotAssignable {
                    operation: format!("argument for reference parameter '{}'", param.name),
                    location: self.ast.get_span(arg),
                });
            }
        }

        let target = match signature.definition {
            Some(definition) => CallTarget::Function(definition),
            None => CallTarget::Builtin(call.name),
        };
        debug!(
            "TypeChecker: '{}({})' resolved to {:?}",
            call.name,
            signature.param_list(),
            target
        );
        debug_assert!(
            signature.definition.is_some() || builtins::is_builtin(call.name),
            "stub without builtin name"
        );
        self.info.call_targets[node_ref.index()] = Some(target);
        Ok(signature.return_type.clone())
    }

    fn describe_arguments(&mut self, args: &[NodeRef], argument_types: &[Option<Type>]) -> String {
        args.iter()
            .zip(argument_types)
            .map(|(&arg, ty)| match ty {
                Some(ty) => ty.to_string(),
                None => self
                    .check_expression(arg, None)
                    .map_or_else(|_| "?".to_string(), |ty| ty.to_string()),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
