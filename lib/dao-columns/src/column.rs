//! The column contract consumed by mappings, binders and result mappers.

use std::any::Any;
use std::fmt;

use crate::{ColumnError, ParamType, QueryMethod, QueryParameterPopulator, Value};

/// Structural identifier of the bean field a column is mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BeanField {
    name: &'static str,
    type_name: &'static str,
}

impl BeanField {
    pub fn new(name: &'static str, type_name: &'static str) -> Self {
        Self { name, type_name }
    }

    /// Identify field `name` holding values of type `C`.
    pub fn of<C>(name: &'static str) -> Self {
        Self::new(name, std::any::type_name::<C>())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for BeanField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.type_name)
    }
}

/// Maps one field of bean type `B` to one database column.
///
/// Implementations are immutable after construction and safe to share across
/// threads without synchronization. The erased signatures (`&dyn Any`,
/// `Box<dyn Any>`) let a mapping hold columns of differing value types in one
/// ordered list; [`ColumnDescriptor`](crate::ColumnDescriptor) also offers
/// typed equivalents.
pub trait Column<B: 'static>: Send + Sync {
    /// The mapped field.
    fn bean_field(&self) -> &BeanField;

    /// The declared parameter type.
    fn param_type(&self) -> ParamType;

    /// Convert a bean-level value, as returned by [`Column::bean_value`], into
    /// a query parameter.
    ///
    /// Fails with [`ColumnError::TypeMismatch`] if `bean_value` is not the
    /// column's value type.
    fn param_value(&self, bean_value: &dyn Any) -> Result<Value, ColumnError>;

    /// The current value of the mapped field.
    fn bean_value(&self, bean: &B) -> Box<dyn Any + Send>;

    /// The binding operation to invoke with the produced parameter.
    fn query_method(&self) -> QueryMethod;

    fn column_name(&self) -> &str;

    /// Whether the persistence layer supplies this column's value.
    fn is_auto_generated(&self) -> bool;

    fn query_parameter_populator(&self) -> Option<&dyn QueryParameterPopulator<B>>;

    /// [`Column::bean_value`] for a bean whose type is only known at runtime.
    fn bean_value_of(&self, bean: &dyn Any) -> Result<Box<dyn Any + Send>, ColumnError> {
        match bean.downcast_ref::<B>() {
            Some(bean) => Ok(self.bean_value(bean)),
            None => Err(ColumnError::TypeMismatch {
                column: self.column_name().to_string(),
                expected: std::any::type_name::<B>().to_string(),
                found: "bean of another type".to_string(),
            }),
        }
    }

    /// Read the field off `bean` and convert it to its parameter form.
    fn bind_value(&self, bean: &B) -> Result<Value, ColumnError> {
        let bean_value = self.bean_value(bean);
        self.param_value(&*bean_value)
    }

    /// Write a result value onto `bean`.
    ///
    /// Columns without a populator return [`ColumnError::MissingPopulator`].
    fn populate(&self, bean: &mut B, value: Value) -> Result<(), ColumnError> {
        match self.query_parameter_populator() {
            Some(populator) => populator
                .populate(bean, value)
                .map_err(|e| e.for_column(self.column_name())),
            None => Err(ColumnError::MissingPopulator {
                column: self.column_name().to_string(),
            }),
        }
    }
}
