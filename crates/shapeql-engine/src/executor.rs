//! Operation execution.
//!
//! An operation walks its selection sets against live records: every field is bound to a
//! capability, resolved, and its value completed according to the field's type. Field errors are
//! recorded once and turn the nearest nullable ancestor into null.

use std::{
    any::Any,
    collections::{HashMap, HashSet},
    future::Future,
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex, PoisonError},
};

use async_graphql_parser::{
    types::{Directive, DocumentOperations, Field, FragmentDefinition, OperationDefinition, OperationType, Selection, SelectionSet},
    Pos, Positioned,
};
use async_graphql_value::{ConstValue, Name};
use futures_util::{
    future::{join_all, BoxFuture},
    stream::{self, BoxStream},
    FutureExt, StreamExt,
};
use indexmap::IndexMap;
use shapeql_schema::{names, CacheHint, FieldNode, Schema, TypeKind, TypeNode, TypeRef};
use tokio_util::sync::CancellationToken;

use crate::{
    binder::{self, Capability, Parent},
    coerce::{self, Variables},
    response::{ResponsePath, ServerError},
    Call, Context, ExecutorConfig, FieldError, Invocable, Object, Request, Response, Value,
};

const CANCELLED: &str = "operation cancelled";
const TIMED_OUT: &str = "operation timed out";

type Json = serde_json::Value;

#[derive(Debug, thiserror::Error)]
enum OperationError {
    #[error("Unknown operation named '{0}'.")]
    UnknownOperation(String),
    #[error("Missing operation name.")]
    MissingOperationName,
    #[error("the schema has no {0} root type")]
    MissingRoot(&'static str),
    #[error("subscriptions are only supported over a websocket connection")]
    SubscriptionOverHttp,
    #[error("a subscription must select exactly one root field")]
    SubscriptionRootFields,
}

impl From<OperationError> for ServerError {
    fn from(err: OperationError) -> Self {
        ServerError::new(err.to_string())
    }
}

struct ParsedOperation {
    definition: OperationDefinition,
    fragments: HashMap<Name, Positioned<FragmentDefinition>>,
    variables: Variables,
}

fn parse_operation(request: Request) -> Result<ParsedOperation, ServerError> {
    let document = async_graphql_parser::parse_query(&request.query)?;

    let operation = if let Some(operation_name) = request.operation_name.as_deref() {
        match document.operations {
            DocumentOperations::Single(_) => None,
            DocumentOperations::Multiple(mut operations) => operations.remove(operation_name),
        }
        .ok_or_else(|| OperationError::UnknownOperation(operation_name.to_string()))?
    } else {
        match document.operations {
            DocumentOperations::Single(operation) => operation,
            DocumentOperations::Multiple(operations) if operations.len() == 1 => operations
                .into_values()
                .next()
                .ok_or(OperationError::MissingOperationName)?,
            DocumentOperations::Multiple(_) => return Err(OperationError::MissingOperationName.into()),
        }
    };

    let variables = coerce::variables(&operation.node.variable_definitions, request.variables)?;

    Ok(ParsedOperation {
        definition: operation.node,
        fragments: document.fragments,
        variables,
    })
}

fn operation_kind(operation: OperationType) -> &'static str {
    match operation {
        OperationType::Query => "query",
        OperationType::Mutation => "mutation",
        OperationType::Subscription => "subscription",
    }
}

/// Executes operations against a schema and its live root records. Cheap to clone.
#[derive(Clone)]
pub struct Executor {
    inner: Arc<Inner>,
}

struct Inner {
    schema: Schema,
    query: Arc<dyn Object>,
    mutation: Option<Arc<dyn Object>>,
    subscription: Option<Arc<dyn Object>>,
    config: ExecutorConfig,
}

pub struct ExecutorBuilder {
    inner: Inner,
}

impl ExecutorBuilder {
    #[must_use]
    pub fn mutation(mut self, root: impl Object) -> Self {
        self.inner.mutation = Some(Arc::new(root));
        self
    }

    #[must_use]
    pub fn subscription(mut self, root: impl Object) -> Self {
        self.inner.subscription = Some(Arc::new(root));
        self
    }

    #[must_use]
    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.inner.config = config;
        self
    }

    pub fn build(self) -> Executor {
        let inner = self.inner;
        let roots = [
            (OperationType::Query, Some(&inner.query)),
            (OperationType::Mutation, inner.mutation.as_ref()),
            (OperationType::Subscription, inner.subscription.as_ref()),
        ];
        for (operation, root) in roots {
            match (inner.schema.root_type(operation), root) {
                (Some(node), Some(root)) if node.native != Some(root.native_type_id()) => {
                    tracing::warn!(root = %node.name, "root record does not match the schema's {} type", operation_kind(operation));
                }
                (Some(node), None) => {
                    tracing::warn!(root = %node.name, "no root record for the schema's {} type", operation_kind(operation));
                }
                _ => {}
            }
        }

        Executor { inner: Arc::new(inner) }
    }
}

impl Executor {
    pub fn builder(schema: Schema, query: impl Object) -> ExecutorBuilder {
        ExecutorBuilder {
            inner: Inner {
                schema,
                query: Arc::new(query),
                mutation: None,
                subscription: None,
                config: ExecutorConfig::default(),
            },
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.inner.config
    }

    /// Executes a query or mutation.
    pub async fn execute(&self, request: Request) -> Response {
        self.execute_with_token(request, CancellationToken::new()).await
    }

    /// Executes a query or mutation that stops once `token` is cancelled.
    pub async fn execute_with_token(&self, request: Request, token: CancellationToken) -> Response {
        match parse_operation(request) {
            Ok(operation) => self.execute_operation(operation, token).await,
            Err(err) => Response::request_error(err),
        }
    }

    /// Starts a subscription. Every event of the source stream produces one response.
    ///
    /// Queries and mutations are accepted as well and produce a single response.
    pub async fn subscribe(
        &self,
        request: Request,
        token: CancellationToken,
    ) -> Result<BoxStream<'static, Response>, Vec<ServerError>> {
        let operation = parse_operation(request).map_err(|err| vec![err])?;

        if operation.definition.ty != OperationType::Subscription {
            let this = self.clone();
            return Ok(stream::once(async move { this.execute_operation(operation, token).await }).boxed());
        }

        let (root_type, root) = self
            .root(OperationType::Subscription)
            .map_err(|err| vec![err.into()])?;

        let operation = Arc::new(operation);
        let events = {
            let execution = Execution::new(self.schema(), &operation, Context::new(token.clone()), false);
            execution.source_stream(root_type, Parent::new(root, None)).await?
        };
        tracing::debug!("subscription started");

        let this = self.clone();
        let events = events.then(move |event| {
            let this = this.clone();
            let operation = Arc::clone(&operation);
            let token = token.clone();
            async move { this.execute_event(&operation, event, token).await }
        });

        Ok(events.boxed())
    }

    fn root(&self, operation: OperationType) -> Result<(&TypeNode, Arc<dyn Object>), OperationError> {
        let root = match operation {
            OperationType::Query => Some(&self.inner.query),
            OperationType::Mutation => self.inner.mutation.as_ref(),
            OperationType::Subscription => self.inner.subscription.as_ref(),
        };
        match (self.schema().root_type(operation), root) {
            (Some(node), Some(root)) => Ok((node, Arc::clone(root))),
            _ => Err(OperationError::MissingRoot(operation_kind(operation))),
        }
    }

    async fn execute_operation(&self, operation: ParsedOperation, token: CancellationToken) -> Response {
        let execution = self.run(&operation, token.clone());
        let Some(timeout) = self.inner.config.timeout else {
            return execution.await;
        };

        match tokio::time::timeout(timeout, execution).await {
            Ok(response) => response,
            Err(_) => {
                token.cancel();
                tracing::warn!(?timeout, "{TIMED_OUT}");
                Response::aborted(TIMED_OUT)
            }
        }
    }

    async fn run(&self, operation: &ParsedOperation, token: CancellationToken) -> Response {
        let ty = operation.definition.ty;
        if ty == OperationType::Subscription {
            return Response::request_error(OperationError::SubscriptionOverHttp.into());
        }
        let (root_type, root) = match self.root(ty) {
            Ok(root) => root,
            Err(err) => return Response::request_error(err.into()),
        };
        tracing::debug!(operation = operation_kind(ty), "executing operation");

        let execution = Execution::new(self.schema(), operation, Context::new(token), self.inner.config.concurrent);
        let result = execution
            .execute_selection_set(
                root_type,
                Parent::new(root, None),
                vec![&operation.definition.selection_set.node],
                ResponsePath::default(),
                ty == OperationType::Mutation,
            )
            .await;

        execution.finish(result)
    }

    async fn execute_event(&self, operation: &ParsedOperation, event: Value, token: CancellationToken) -> Response {
        let root_type = match self.root(OperationType::Subscription) {
            Ok((root_type, _)) => root_type,
            Err(err) => return Response::request_error(err.into()),
        };
        let execution = Execution::new(self.schema(), operation, Context::new(token), self.inner.config.concurrent);
        let result = execution.complete_event(root_type, event).await;
        execution.finish(result)
    }
}

/// Why a value could not be completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Incomplete {
    /// The error has been recorded; the nearest nullable ancestor becomes null.
    Null,
    Cancelled,
}

enum ResolveError {
    Field(FieldError),
    Cancelled,
}

impl From<FieldError> for ResolveError {
    fn from(err: FieldError) -> Self {
        ResolveError::Field(err)
    }
}

/// The state of one operation (or of one subscription event).
struct Execution<'a> {
    schema: &'a Schema,
    operation: &'a ParsedOperation,
    context: Context,
    concurrent: bool,
    errors: Mutex<Vec<ServerError>>,
    cache: Mutex<CacheHint>,
}

impl<'a> Execution<'a> {
    fn new(schema: &'a Schema, operation: &'a ParsedOperation, context: Context, concurrent: bool) -> Self {
        Execution {
            schema,
            operation,
            context,
            concurrent,
            errors: Mutex::new(Vec::new()),
            cache: Mutex::new(CacheHint::Inherit),
        }
    }

    fn finish(self, result: Result<Json, Incomplete>) -> Response {
        if self.context.is_cancelled() || result == Err(Incomplete::Cancelled) {
            tracing::debug!("{CANCELLED}");
            return Response::aborted(CANCELLED);
        }

        Response {
            data: Some(result.unwrap_or(Json::Null)),
            errors: self.errors.into_inner().unwrap_or_else(PoisonError::into_inner),
            cache: self.cache.into_inner().unwrap_or_else(PoisonError::into_inner),
        }
    }

    fn record(&self, error: ServerError) {
        tracing::debug!(message = %error.message, "field error");
        if let Ok(mut errors) = self.errors.lock() {
            errors.push(error);
        }
    }

    fn fail(&self, message: impl Into<String>, pos: Pos, path: &ResponsePath) -> Result<Json, Incomplete> {
        self.record(ServerError::new(message).at(pos).with_path(path));
        Err(Incomplete::Null)
    }

    fn note_cache(&self, hint: CacheHint) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = cache.merge(hint);
        }
    }

    async fn join<F: Future>(&self, futures: Vec<F>, serial: bool) -> Vec<F::Output> {
        if serial || !self.concurrent {
            let mut outputs = Vec::with_capacity(futures.len());
            for future in futures {
                outputs.push(future.await);
            }
            outputs
        } else {
            join_all(futures).await
        }
    }

    fn execute_selection_set<'s>(
        &'s self,
        object: &'a TypeNode,
        parent: Parent,
        selection_sets: Vec<&'a SelectionSet>,
        path: ResponsePath,
        serial: bool,
    ) -> BoxFuture<'s, Result<Json, Incomplete>> {
        async move {
            let grouped = self.collect_fields(object, &selection_sets);
            let keys: Vec<&'a str> = grouped.keys().copied().collect();
            let futures = grouped
                .into_iter()
                .map(|(key, fields)| self.resolve_field(object, parent.clone(), fields, path.child(key)))
                .collect();
            let results = self.join(futures, serial).await;

            let mut data = serde_json::Map::with_capacity(keys.len());
            let mut incomplete = None;
            for (key, result) in keys.into_iter().zip(results) {
                match result {
                    Ok(value) => {
                        data.insert(key.to_string(), value);
                    }
                    Err(Incomplete::Cancelled) => return Err(Incomplete::Cancelled),
                    Err(Incomplete::Null) => incomplete = Some(Incomplete::Null),
                }
            }

            match incomplete {
                Some(incomplete) => Err(incomplete),
                None => Ok(Json::Object(data)),
            }
        }
        .boxed()
    }

    fn collect_fields(
        &self,
        object: &TypeNode,
        selection_sets: &[&'a SelectionSet],
    ) -> IndexMap<&'a str, Vec<&'a Positioned<Field>>> {
        let mut grouped = IndexMap::new();
        let mut visited = HashSet::new();
        for selection_set in selection_sets {
            self.collect_into(object, selection_set, &mut visited, &mut grouped);
        }
        grouped
    }

    fn collect_into(
        &self,
        object: &TypeNode,
        selection_set: &'a SelectionSet,
        visited: &mut HashSet<&'a str>,
        grouped: &mut IndexMap<&'a str, Vec<&'a Positioned<Field>>>,
    ) {
        let operation: &'a ParsedOperation = self.operation;

        for selection in &selection_set.items {
            match &selection.node {
                Selection::Field(field) => {
                    if self.is_skipped(&field.node.directives) {
                        continue;
                    }
                    let key = field.node.alias.as_ref().unwrap_or(&field.node.name).node.as_str();
                    grouped.entry(key).or_default().push(field);
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.node.fragment_name.node.as_str();
                    if self.is_skipped(&spread.node.directives) || !visited.insert(name) {
                        continue;
                    }
                    let Some(fragment) = operation.fragments.get(name) else {
                        continue;
                    };
                    if self.applies(object, &fragment.node.type_condition.node.on.node) {
                        self.collect_into(object, &fragment.node.selection_set.node, visited, grouped);
                    }
                }
                Selection::InlineFragment(fragment) => {
                    if self.is_skipped(&fragment.node.directives) {
                        continue;
                    }
                    let applies = fragment
                        .node
                        .type_condition
                        .as_ref()
                        .map_or(true, |condition| self.applies(object, &condition.node.on.node));
                    if applies {
                        self.collect_into(object, &fragment.node.selection_set.node, visited, grouped);
                    }
                }
            }
        }
    }

    fn applies(&self, object: &TypeNode, condition: &str) -> bool {
        self.schema.is_possible_type(condition, &object.name)
    }

    fn is_skipped(&self, directives: &[Positioned<Directive>]) -> bool {
        directives.iter().any(|directive| {
            let condition = || {
                directive
                    .node
                    .get_argument("if")
                    .map(|value| coerce::resolve(value.node.clone(), &self.operation.variables))
                    == Some(ConstValue::Boolean(true))
            };
            match directive.node.name.node.as_str() {
                "skip" => condition(),
                "include" => !condition(),
                _ => false,
            }
        })
    }

    fn resolve_field<'s>(
        &'s self,
        object: &'a TypeNode,
        parent: Parent,
        fields: Vec<&'a Positioned<Field>>,
        path: ResponsePath,
    ) -> BoxFuture<'s, Result<Json, Incomplete>> {
        async move {
            let Some(field) = fields.first().copied() else {
                return Ok(Json::Null);
            };
            let name = field.node.name.node.as_str();
            if name == names::TYPENAME {
                return Ok(Json::String(object.name.clone()));
            }
            if self.context.is_cancelled() {
                return Err(Incomplete::Cancelled);
            }
            let Some(node) = object.field(name) else {
                return self.fail(format!("unknown field {name} on type {}", object.name), field.pos, &path);
            };

            tracing::trace!(path = %path, "resolving field");
            self.note_cache(node.cache);

            let result = match self.resolve_value(node, &parent, field).await {
                Ok((value, key)) => {
                    let selection_sets = fields.iter().map(|field| &field.node.selection_set.node).collect();
                    self.complete_value(&node.ty, value, key, selection_sets, field.pos, path).await
                }
                Err(ResolveError::Cancelled) => Err(Incomplete::Cancelled),
                Err(ResolveError::Field(err)) => {
                    self.record(err.into_server_error(field.pos, &path));
                    Err(Incomplete::Null)
                }
            };

            match result {
                Err(Incomplete::Null) if node.is_nullable() => Ok(Json::Null),
                result => result,
            }
        }
        .boxed()
    }

    /// Produces the value of a field together with the collection key it was selected by.
    async fn resolve_value(
        &self,
        node: &'a FieldNode,
        parent: &Parent,
        field: &'a Positioned<Field>,
    ) -> Result<(Value, Option<Value>), ResolveError> {
        let arguments = coerce::arguments(self.schema, node, &field.node, &self.operation.variables)?;

        match Capability::bind(node, parent)? {
            Capability::Direct(value) | Capability::Collection(value) | Capability::Key(value) => Ok((value, None)),
            Capability::Invocable(invocable) => {
                let arguments = arguments.into_iter().map(|(_, value)| value);
                Ok((self.invoke(invocable, Call::new(self.context.clone(), arguments)).await?, None))
            }
            Capability::Subscript { collection, argument } => {
                let key = arguments
                    .into_iter()
                    .find_map(|(name, value)| (name == argument).then_some(value))
                    .unwrap_or(Value::Null);
                let element = binder::subscript(&collection, &key)?;
                Ok((element, Some(key)))
            }
        }
    }

    /// Calls a resolver. A panic becomes an internal field error; cancellation stops waiting.
    async fn invoke(&self, invocable: Invocable, call: Call) -> Result<Value, ResolveError> {
        let resolver = AssertUnwindSafe(invocable.call(call)).catch_unwind();

        tokio::select! {
            biased;
            () = self.context.cancelled() => Err(ResolveError::Cancelled),
            result = resolver => match result {
                Ok(result) => result.map_err(ResolveError::Field),
                Err(panic) => {
                    let message = panic_message(&*panic);
                    tracing::warn!(%message, "resolver panicked");
                    Err(ResolveError::Field(FieldError::internal(message)))
                }
            },
        }
    }

    fn complete_value<'s>(
        &'s self,
        ty: &'a TypeRef,
        value: Value,
        key: Option<Value>,
        selection_sets: Vec<&'a SelectionSet>,
        pos: Pos,
        path: ResponsePath,
    ) -> BoxFuture<'s, Result<Json, Incomplete>> {
        async move {
            match ty {
                TypeRef::NonNull(inner) => {
                    let completed = self
                        .complete_value(inner, value, key, selection_sets, pos, path.clone())
                        .await?;
                    if completed.is_null() {
                        return self.fail(format!("null returned for non-null type {ty}"), pos, &path);
                    }
                    Ok(completed)
                }
                TypeRef::List(item) => {
                    let elements: Vec<(Value, Value)> = match value {
                        Value::Null => return Ok(Json::Null),
                        Value::List(items) => (0_i64..).map(Value::Int).zip(items).collect(),
                        Value::Map(entries) => entries,
                        other => return self.fail(format!("expected a list, found {}", other.kind_name()), pos, &path),
                    };

                    let futures = elements
                        .into_iter()
                        .enumerate()
                        .map(|(index, (key, element))| {
                            let path = path.child(index);
                            let selection_sets = selection_sets.clone();
                            async move {
                                match self.complete_value(item, element, Some(key), selection_sets, pos, path).await {
                                    Err(Incomplete::Null) if item.is_nullable() => Ok(Json::Null),
                                    result => result,
                                }
                            }
                        })
                        .collect();

                    self.join(futures, false)
                        .await
                        .into_iter()
                        .collect::<Result<Vec<_>, _>>()
                        .map(Json::Array)
                }
                TypeRef::Named(name) => match value {
                    Value::Null => Ok(Json::Null),
                    value => self.complete_named(name, value, key, selection_sets, pos, path).await,
                },
            }
        }
        .boxed()
    }

    async fn complete_named(
        &self,
        name: &'a str,
        value: Value,
        key: Option<Value>,
        selection_sets: Vec<&'a SelectionSet>,
        pos: Pos,
        path: ResponsePath,
    ) -> Result<Json, Incomplete> {
        let mismatch = |value: &Value| format!("{} cannot be returned as {name}", value.kind_name());

        match (name, value) {
            (names::INT, Value::Int(number)) => Ok(Json::from(number)),
            (names::FLOAT, Value::Float(number)) => match serde_json::Number::from_f64(number) {
                Some(number) => Ok(Json::Number(number)),
                None => self.fail(format!("{number} is not a finite Float"), pos, &path),
            },
            #[allow(clippy::cast_precision_loss)]
            (names::FLOAT, Value::Int(number)) => Ok(Json::from(number as f64)),
            (names::STRING | names::ID, Value::String(text)) => Ok(Json::String(text)),
            (names::ID, Value::Int(number)) => Ok(Json::String(number.to_string())),
            (names::BOOLEAN, Value::Bool(value)) => Ok(Json::Bool(value)),
            (name, value) if names::is_builtin_scalar(name) => self.fail(mismatch(&value), pos, &path),
            (name, value) => {
                let schema: &'a Schema = self.schema;
                let Some(node) = schema.type_node(name) else {
                    return self.fail(format!("unknown type {name}"), pos, &path);
                };

                match (node.kind, value) {
                    (TypeKind::Enum, Value::Int(ordinal)) => match node.enum_value(ordinal) {
                        Some(value) => Ok(Json::String(value.name.clone())),
                        None => self.fail(format!("{ordinal} is not an ordinal of enum {name}"), pos, &path),
                    },
                    (TypeKind::Scalar, Value::String(text)) => Ok(Json::String(text)),
                    (TypeKind::Scalar, Value::Bool(value)) => Ok(Json::Bool(value)),
                    (TypeKind::Scalar, Value::Int(number)) => Ok(Json::from(number)),
                    (TypeKind::Object | TypeKind::Interface | TypeKind::Union, Value::Object(object)) => {
                        let concrete = if node.kind == TypeKind::Object {
                            Some(node)
                        } else {
                            schema
                                .object_for(object.native_type_id())
                                .filter(|concrete| schema.is_possible_type(name, &concrete.name))
                        };
                        let Some(concrete) = concrete else {
                            return self.fail(format!("could not determine the concrete type of {name}"), pos, &path);
                        };
                        self.execute_selection_set(concrete, Parent::new(object, key), selection_sets, path, false)
                            .await
                    }
                    (_, value) => self.fail(mismatch(&value), pos, &path),
                }
            }
        }
    }

    /// Resolves the single root field of a subscription to its event stream.
    async fn source_stream(
        &self,
        root_type: &'a TypeNode,
        parent: Parent,
    ) -> Result<BoxStream<'static, Value>, Vec<ServerError>> {
        let (key, fields, node) = self.subscription_field(root_type).map_err(|err| vec![err])?;
        let Some(field) = fields.first().copied() else {
            return Err(vec![OperationError::SubscriptionRootFields.into()]);
        };
        let path = ResponsePath::default().child(key);

        let value = match self.resolve_value(node, &parent, field).await {
            Ok((value, _)) => value,
            Err(ResolveError::Field(err)) => return Err(vec![err.into_server_error(field.pos, &path)]),
            Err(ResolveError::Cancelled) => return Err(vec![ServerError::new(CANCELLED)]),
        };

        match value {
            Value::Stream(source) => source
                .take()
                .ok_or_else(|| vec![ServerError::new("the event stream was already consumed").at(field.pos)]),
            other => Err(vec![ServerError::new(format!(
                "subscription field {} produced {} instead of an event stream",
                node.name,
                other.kind_name()
            ))
            .at(field.pos)]),
        }
    }

    /// Runs the selection set of a subscription's root field against one event.
    async fn complete_event(&self, root_type: &'a TypeNode, event: Value) -> Result<Json, Incomplete> {
        let (key, fields, node) = match self.subscription_field(root_type) {
            Ok(field) => field,
            Err(err) => {
                self.record(err);
                return Err(Incomplete::Null);
            }
        };
        let Some(field) = fields.first().copied() else {
            return Err(Incomplete::Null);
        };
        if self.context.is_cancelled() {
            return Err(Incomplete::Cancelled);
        }

        let selection_sets = fields.iter().map(|field| &field.node.selection_set.node).collect();
        let path = ResponsePath::default().child(key);
        let value = match self.complete_value(&node.ty, event, None, selection_sets, field.pos, path).await {
            Err(Incomplete::Null) if node.is_nullable() => Json::Null,
            result => result?,
        };

        let mut data = serde_json::Map::new();
        data.insert(key.to_string(), value);
        Ok(Json::Object(data))
    }

    fn subscription_field(
        &self,
        root_type: &'a TypeNode,
    ) -> Result<(&'a str, Vec<&'a Positioned<Field>>, &'a FieldNode), ServerError> {
        let operation: &'a ParsedOperation = self.operation;
        let mut grouped = self.collect_fields(root_type, &[&operation.definition.selection_set.node]);
        if grouped.len() != 1 {
            return Err(OperationError::SubscriptionRootFields.into());
        }
        let Some((key, fields)) = grouped.pop() else {
            return Err(OperationError::SubscriptionRootFields.into());
        };
        let Some(field) = fields.first() else {
            return Err(OperationError::SubscriptionRootFields.into());
        };

        let name = field.node.name.node.as_str();
        let node = root_type
            .field(name)
            .ok_or_else(|| ServerError::new(format!("unknown field {name} on type {}", root_type.name)).at(field.pos))?;

        Ok((key, fields, node))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "resolver panicked".to_string())
}
