//! Writing result values back onto beans.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::convert::decode;
use crate::{ColumnError, ColumnValue, ParamType, Value};

/// Reads one column's value out of a query result and writes it onto a bean.
pub trait QueryParameterPopulator<B>: Send + Sync {
    /// The parameter type this populator decodes.
    fn param_type(&self) -> ParamType;

    /// Decode `value` and store it on `bean`.
    fn populate(&self, bean: &mut B, value: Value) -> Result<(), ColumnError>;
}

pub(crate) type Setter<B, C> = Arc<dyn Fn(&mut B, C) + Send + Sync>;
pub(crate) type Decoder<C> = Arc<dyn Fn(Value) -> Result<C, ColumnError> + Send + Sync>;

/// Populator built from a typed field setter.
pub struct SetterPopulator<B, C> {
    param_type: ParamType,
    decoder: Decoder<C>,
    setter: Setter<B, C>,
    _marker: PhantomData<fn() -> C>,
}

impl<B, C: ColumnValue> SetterPopulator<B, C> {
    /// Decode with [`ColumnValue::from_value`], narrowing widened values first.
    pub fn new(param_type: ParamType, setter: impl Fn(&mut B, C) + Send + Sync + 'static) -> Self {
        Self::from_parts(param_type, Arc::new(decode::<C>), Arc::new(setter))
    }
}

impl<B, C> SetterPopulator<B, C> {
    /// Decode with a custom function, for columns whose stored form differs from `C`.
    pub fn with_decoder(
        param_type: ParamType,
        decoder: impl Fn(Value) -> Result<C, ColumnError> + Send + Sync + 'static,
        setter: impl Fn(&mut B, C) + Send + Sync + 'static,
    ) -> Self {
        Self::from_parts(param_type, Arc::new(decoder), Arc::new(setter))
    }

    pub(crate) fn from_parts(param_type: ParamType, decoder: Decoder<C>, setter: Setter<B, C>) -> Self {
        Self {
            param_type,
            decoder,
            setter,
            _marker: PhantomData,
        }
    }
}

impl<B, C> QueryParameterPopulator<B> for SetterPopulator<B, C> {
    fn param_type(&self) -> ParamType {
        self.param_type
    }

    fn populate(&self, bean: &mut B, value: Value) -> Result<(), ColumnError> {
        let decoded = (self.decoder)(value)?;
        (self.setter)(bean, decoded);
        Ok(())
    }
}
