//! Resolver functions.
//!
//! A record field of type [`Func<fn(A, ..) -> R>`](Func) is resolved by calling the wrapped
//! closure. The function pointer type only describes the signature to the schema builder; the
//! closure itself is type-erased into an [`Invocable`].

use std::{collections::VecDeque, fmt, future::Future, marker::PhantomData, sync::Arc};

use futures_util::{future::BoxFuture, stream::BoxStream, FutureExt, Stream, StreamExt};
use shapeql_schema::{NativeKind, NativeType, Reflect};

use crate::{Context, FieldError, FromValue, SourceStream, ToValue, Value};

pub type ResolverFuture = BoxFuture<'static, Result<Value, FieldError>>;

/// A type-erased resolver.
#[derive(Clone)]
pub struct Invocable(Arc<dyn Fn(Call) -> ResolverFuture + Send + Sync>);

impl Invocable {
    pub fn new(resolver: impl Fn(Call) -> ResolverFuture + Send + Sync + 'static) -> Self {
        Invocable(Arc::new(resolver))
    }

    pub fn call(&self, call: Call) -> ResolverFuture {
        (self.0)(call)
    }
}

impl fmt::Debug for Invocable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Invocable")
    }
}

/// The inputs of one resolver invocation: the operation context and the coerced arguments in
/// declaration order.
pub struct Call {
    context: Context,
    arguments: VecDeque<Value>,
}

impl Call {
    pub fn new(context: Context, arguments: impl IntoIterator<Item = Value>) -> Self {
        Call {
            context,
            arguments: arguments.into_iter().collect(),
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn next_argument(&mut self) -> Value {
        self.arguments.pop_front().unwrap_or(Value::Null)
    }
}

/// A resolver parameter.
pub trait Param: Sized + Send + 'static {
    fn extract(call: &mut Call) -> Result<Self, FieldError>;
}

impl<T: FromValue + Send + 'static> Param for T {
    fn extract(call: &mut Call) -> Result<Self, FieldError> {
        T::from_value(call.next_argument())
    }
}

impl Param for Context {
    fn extract(call: &mut Call) -> Result<Self, FieldError> {
        Ok(call.context.clone())
    }
}

/// What a resolver may return.
pub trait IntoFieldResult {
    fn into_field_result(self) -> Result<Value, FieldError>;
}

impl<T: ToValue> IntoFieldResult for T {
    fn into_field_result(self) -> Result<Value, FieldError> {
        Ok(self.to_value())
    }
}

impl<T: IntoFieldResult> IntoFieldResult for Result<T, FieldError> {
    fn into_field_result(self) -> Result<Value, FieldError> {
        self.and_then(IntoFieldResult::into_field_result)
    }
}

/// The source stream returned by a subscription resolver.
pub struct EventStream<T> {
    inner: BoxStream<'static, T>,
}

impl<T> EventStream<T> {
    pub fn new(stream: impl Stream<Item = T> + Send + 'static) -> Self {
        EventStream { inner: stream.boxed() }
    }
}

impl<T: Reflect> Reflect for EventStream<T> {
    fn native_type() -> NativeType {
        NativeType::new::<Self>(None, NativeKind::Stream(T::native_type))
    }
}

impl<T: ToValue + Send + 'static> IntoFieldResult for EventStream<T> {
    fn into_field_result(self) -> Result<Value, FieldError> {
        let events = self.inner.map(|event| event.to_value());
        Ok(Value::Stream(SourceStream::new(events)))
    }
}

/// A resolver function stored in a record field. `S` is the function pointer type describing
/// its signature, e.g. `Func<fn(Context, i32) -> Result<String, FieldError>>`.
pub struct Func<S> {
    invocable: Invocable,
    signature: PhantomData<fn() -> S>,
}

impl<S> Func<S> {
    pub fn new(resolver: impl IntoInvocable<S>) -> Self {
        Func::from_invocable(resolver.into_invocable())
    }

    pub fn from_invocable(invocable: Invocable) -> Self {
        Func {
            invocable,
            signature: PhantomData,
        }
    }

    pub fn invocable(&self) -> &Invocable {
        &self.invocable
    }
}

impl<S> Clone for Func<S> {
    fn clone(&self) -> Self {
        Func::from_invocable(self.invocable.clone())
    }
}

impl<S> fmt::Debug for Func<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Func")
    }
}

impl<S: Reflect> Reflect for Func<S> {
    fn native_type() -> NativeType {
        S::native_type()
    }
}

impl<S> ToValue for Func<S> {
    fn to_value(&self) -> Value {
        Value::Function(self.invocable.clone())
    }
}

/// Closures that can back a [`Func`] with signature `S`.
///
/// Implemented for `Fn(A, ..) -> impl Future<Output = R>` closures of up to four parameters,
/// where every parameter is a [`Param`] and `R` an [`IntoFieldResult`].
pub trait IntoInvocable<S> {
    fn into_invocable(self) -> Invocable;
}

macro_rules! impl_into_invocable {
    ($($param:ident),*) => {
        impl<F, Fut, R, $($param,)*> IntoInvocable<fn($($param),*) -> R> for F
        where
            F: Fn($($param),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoFieldResult,
            $($param: Param,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn into_invocable(self) -> Invocable {
                let resolver = Arc::new(self);
                Invocable::new(move |mut call: Call| {
                    let resolver = Arc::clone(&resolver);
                    async move {
                        $(let $param = <$param as Param>::extract(&mut call)?;)*
                        resolver($($param),*).await.into_field_result()
                    }
                    .boxed()
                })
            }
        }
    };
}

impl_into_invocable!();
impl_into_invocable!(A);
impl_into_invocable!(A, B);
impl_into_invocable!(A, B, C);
impl_into_invocable!(A, B, C, D);

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parameters_are_extracted_in_order() {
        let func: Func<fn(Context, i32, String) -> String> =
            Func::new(|_: Context, count: i32, word: String| async move { word.repeat(count as usize) });

        let call = Call::new(Context::default(), [Value::Int(3), Value::String("ab".into())]);
        let result = func.invocable().call(call).await;
        assert!(matches!(result, Ok(Value::String(text)) if text == "ababab"));
    }

    #[tokio::test]
    async fn errors_short_circuit() {
        let func: Func<fn(u8) -> Result<u8, FieldError>> =
            Func::new(|n: u8| async move { n.checked_mul(2).ok_or_else(|| FieldError::new("overflow")) });

        let result = func.invocable().call(Call::new(Context::default(), [Value::Int(200)])).await;
        assert_eq!(result.unwrap_err().message(), "overflow");

        let result = func.invocable().call(Call::new(Context::default(), [Value::Int(-1)])).await;
        assert_eq!(result.unwrap_err().message(), "-1 is out of range for u8");
    }
}
