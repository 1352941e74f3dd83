//! Column descriptors built from typed accessor closures.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::convert::decode;
use crate::populator::{Decoder, Setter, SetterPopulator};
use crate::{
    BeanField, Column, ColumnError, ColumnValue, ParamType, QueryMethod, QueryParameterPopulator,
    Value,
};

type Getter<B, C> = Arc<dyn Fn(&B) -> C + Send + Sync>;
type Encoder<C> = Arc<dyn Fn(&C) -> Value + Send + Sync>;

/// Immutable mapping of one field of `B` (holding a `C`) to one column.
///
/// Built with [`ColumnDescriptor::builder`] for types implementing
/// [`ColumnValue`], or [`ColumnDescriptor::custom`] for types with their own
/// conversion functions.
pub struct ColumnDescriptor<B, C> {
    bean_field: BeanField,
    column_name: String,
    param_type: ParamType,
    query_method: QueryMethod,
    auto_generated: bool,
    getter: Getter<B, C>,
    encoder: Encoder<C>,
    populator: Option<Arc<dyn QueryParameterPopulator<B>>>,
}

impl<B: 'static, C: ColumnValue> ColumnDescriptor<B, C> {
    /// Start a descriptor for field `field`, read with `getter`.
    ///
    /// The column name defaults to the field name and the parameter type to
    /// `C::PARAM_TYPE`.
    pub fn builder(
        field: &'static str,
        getter: impl Fn(&B) -> C + Send + Sync + 'static,
    ) -> ColumnBuilder<B, C> {
        ColumnBuilder {
            bean_field: BeanField::of::<C>(field),
            column_name: None,
            param_type: None,
            query_method: None,
            auto_generated: false,
            getter: Arc::new(getter),
            encoder: Arc::new(C::to_value),
            decoder: Arc::new(decode::<C>),
            produced: C::PARAM_TYPE,
            checked: true,
            setter: None,
            populator: None,
        }
    }
}

impl<B: 'static, C: Clone + Send + Sync + 'static> ColumnDescriptor<B, C> {
    /// Start a descriptor whose value type has no [`ColumnValue`] impl.
    ///
    /// `to_param` must produce values accepted by `param_type`; since its
    /// output cannot be inspected ahead of time this is checked on every
    /// conversion rather than at build.
    pub fn custom(
        field: &'static str,
        param_type: ParamType,
        getter: impl Fn(&B) -> C + Send + Sync + 'static,
        to_param: impl Fn(&C) -> Value + Send + Sync + 'static,
        from_param: impl Fn(Value) -> Result<C, ColumnError> + Send + Sync + 'static,
    ) -> ColumnBuilder<B, C> {
        ColumnBuilder {
            bean_field: BeanField::of::<C>(field),
            column_name: None,
            param_type: Some(param_type),
            query_method: None,
            auto_generated: false,
            getter: Arc::new(getter),
            encoder: Arc::new(to_param),
            decoder: Arc::new(from_param),
            produced: param_type,
            checked: false,
            setter: None,
            populator: None,
        }
    }

    /// Typed read of the mapped field.
    pub fn read(&self, bean: &B) -> C {
        (self.getter)(bean)
    }

    /// Typed conversion of a bean-level value into its parameter form.
    pub fn convert(&self, value: &C) -> Result<Value, ColumnError> {
        let param = (self.encoder)(value);
        if self.param_type.accepts(&param) {
            return Ok(param);
        }
        match param.param_type() {
            // Right kind of value, but it does not fit the declared type
            Some(produced) if self.param_type.can_bind(produced) => {
                Err(ColumnError::ValueOutOfRange {
                    column: self.column_name.clone(),
                    value: param.to_json().to_string(),
                })
            }
            produced => Err(ColumnError::ParamTypeMismatch {
                column: self.column_name.clone(),
                declared: self.param_type,
                produced: produced.unwrap_or(self.param_type),
            }),
        }
    }
}

impl<B: 'static, C: Clone + Send + Sync + 'static> Column<B> for ColumnDescriptor<B, C> {
    fn bean_field(&self) -> &BeanField {
        &self.bean_field
    }

    fn param_type(&self) -> ParamType {
        self.param_type
    }

    fn param_value(&self, bean_value: &dyn Any) -> Result<Value, ColumnError> {
        match bean_value.downcast_ref::<C>() {
            Some(value) => self.convert(value),
            None => Err(ColumnError::TypeMismatch {
                column: self.column_name.clone(),
                expected: self.bean_field.type_name().to_string(),
                found: "value of another type".to_string(),
            }),
        }
    }

    fn bean_value(&self, bean: &B) -> Box<dyn Any + Send> {
        Box::new(self.read(bean))
    }

    fn query_method(&self) -> QueryMethod {
        self.query_method
    }

    fn column_name(&self) -> &str {
        &self.column_name
    }

    fn is_auto_generated(&self) -> bool {
        self.auto_generated
    }

    fn query_parameter_populator(&self) -> Option<&dyn QueryParameterPopulator<B>> {
        self.populator.as_deref()
    }
}

impl<B, C> fmt::Debug for ColumnDescriptor<B, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDescriptor")
            .field("bean_field", &self.bean_field)
            .field("column_name", &self.column_name)
            .field("param_type", &self.param_type)
            .field("query_method", &self.query_method)
            .field("auto_generated", &self.auto_generated)
            .field("has_populator", &self.populator.is_some())
            .finish()
    }
}

/// Builder for [`ColumnDescriptor`]. All configuration is validated in
/// [`ColumnBuilder::build`].
pub struct ColumnBuilder<B, C> {
    bean_field: BeanField,
    column_name: Option<String>,
    param_type: Option<ParamType>,
    query_method: Option<QueryMethod>,
    auto_generated: bool,
    getter: Getter<B, C>,
    encoder: Encoder<C>,
    decoder: Decoder<C>,
    // Parameter type the encoder produces
    produced: ParamType,
    // Whether `produced` is known statically
    checked: bool,
    setter: Option<Setter<B, C>>,
    populator: Option<Arc<dyn QueryParameterPopulator<B>>>,
}

impl<B: 'static, C: Clone + Send + Sync + 'static> ColumnBuilder<B, C> {
    /// Override the column name (defaults to the field name).
    pub fn column_name(mut self, name: impl Into<String>) -> Self {
        self.column_name = Some(name.into());
        self
    }

    /// Declare the parameter type; must be able to bind what the column produces.
    pub fn param_type(mut self, param_type: ParamType) -> Self {
        self.param_type = Some(param_type);
        self
    }

    /// Override the binding operation (defaults to the one matching the parameter type).
    pub fn query_method(mut self, method: QueryMethod) -> Self {
        self.query_method = Some(method);
        self
    }

    /// Mark the column as supplied by the persistence layer.
    pub fn auto_generated(mut self) -> Self {
        self.auto_generated = true;
        self
    }

    /// Populate the field from result rows through `setter`.
    pub fn setter(mut self, setter: impl Fn(&mut B, C) + Send + Sync + 'static) -> Self {
        self.setter = Some(Arc::new(setter));
        self.populator = None;
        self
    }

    /// Use a hand-written populator instead of a setter.
    pub fn populator(mut self, populator: Arc<dyn QueryParameterPopulator<B>>) -> Self {
        self.populator = Some(populator);
        self.setter = None;
        self
    }

    pub fn build(self) -> Result<ColumnDescriptor<B, C>, ColumnError> {
        let column_name = self
            .column_name
            .unwrap_or_else(|| self.bean_field.name().to_string());
        if column_name.trim().is_empty() {
            return Err(ColumnError::EmptyColumnName {
                field: self.bean_field.name().to_string(),
            });
        }

        let param_type = self.param_type.unwrap_or(self.produced);
        if self.checked && !param_type.can_bind(self.produced) {
            return Err(ColumnError::ParamTypeMismatch {
                column: column_name,
                declared: param_type,
                produced: self.produced,
            });
        }

        let query_method = self
            .query_method
            .unwrap_or_else(|| QueryMethod::for_param_type(param_type));
        if !query_method.can_bind(param_type) {
            return Err(ColumnError::IncompatibleQueryMethod {
                column: column_name,
                method: query_method.to_string(),
                param_type,
            });
        }

        let populator = match (self.setter, self.populator) {
            (Some(setter), _) => Some(Arc::new(SetterPopulator::from_parts(
                param_type,
                self.decoder,
                setter,
            )) as Arc<dyn QueryParameterPopulator<B>>),
            (None, Some(populator)) => {
                if !populator.param_type().can_bind(param_type) {
                    return Err(ColumnError::ParamTypeMismatch {
                        column: column_name,
                        declared: param_type,
                        produced: populator.param_type(),
                    });
                }
                Some(populator)
            }
            (None, None) => None,
        };

        trace!(
            column = %column_name,
            field = %self.bean_field,
            %param_type,
            %query_method,
            auto_generated = self.auto_generated,
            "built column descriptor"
        );

        Ok(ColumnDescriptor {
            bean_field: self.bean_field,
            column_name,
            param_type,
            query_method,
            auto_generated: self.auto_generated,
            getter: self.getter,
            encoder: self.encoder,
            populator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoundParameters, bind_column};
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Invoice {
        id: i64,
        number: String,
        lines: i32,
        paid: Option<bool>,
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Meter {
        reading: i64,
        serial: u64,
        calibrated_at: Option<crate::Timestamp>,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Status {
        Open,
        Closed,
    }

    #[test]
    fn defaults_come_from_field_and_value_type() {
        let col = ColumnDescriptor::builder("number", |i: &Invoice| i.number.clone())
            .build()
            .unwrap();
        assert_eq!(col.column_name(), "number");
        assert_eq!(col.param_type(), ParamType::Text);
        assert_eq!(col.query_method(), QueryMethod::SetString);
        assert!(!col.is_auto_generated());
        assert!(col.query_parameter_populator().is_none());
        assert_eq!(col.bean_field().name(), "number");
        assert_eq!(col.bean_field().type_name(), std::any::type_name::<String>());
    }

    #[test]
    fn blank_column_name_is_rejected() {
        let err = ColumnDescriptor::builder("number", |i: &Invoice| i.number.clone())
            .column_name("   ")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ColumnError::EmptyColumnName {
                field: "number".to_string()
            }
        );
    }

    #[test]
    fn incompatible_param_type_fails_at_build() {
        let err = ColumnDescriptor::builder("number", |i: &Invoice| i.number.clone())
            .param_type(ParamType::Integer)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ColumnError::ParamTypeMismatch {
                column: "number".to_string(),
                declared: ParamType::Integer,
                produced: ParamType::Text,
            }
        );
    }

    #[test]
    fn widening_param_type_is_accepted() {
        let col = ColumnDescriptor::builder("lines", |i: &Invoice| i.lines)
            .param_type(ParamType::BigInt)
            .build()
            .unwrap();
        assert_eq!(col.query_method(), QueryMethod::SetLong);
        assert_eq!(col.convert(&3).unwrap(), Value::Int(3));
    }

    #[test]
    fn incompatible_query_method_fails_at_build() {
        let err = ColumnDescriptor::builder("paid", |i: &Invoice| i.paid)
            .query_method(QueryMethod::SetTimestamp)
            .build()
            .unwrap_err();
        assert!(matches!(err, ColumnError::IncompatibleQueryMethod { .. }));
    }

    #[test]
    fn param_value_rejects_foreign_value_types() {
        let col = ColumnDescriptor::builder("id", |i: &Invoice| i.id)
            .build()
            .unwrap();
        let err = col.param_value(&"not an i64").unwrap_err();
        assert!(matches!(err, ColumnError::TypeMismatch { .. }));
        assert_eq!(col.param_value(&42_i64).unwrap(), Value::Int(42));
    }

    #[test]
    fn bean_value_of_rejects_unrelated_beans() {
        let col = ColumnDescriptor::builder("id", |i: &Invoice| i.id)
            .build()
            .unwrap();
        let err = col.bean_value_of(&Status::Open).unwrap_err();
        match err {
            ColumnError::TypeMismatch { column, expected, .. } => {
                assert_eq!(column, "id");
                assert!(expected.ends_with("Invoice"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let invoice = Invoice {
            id: 5,
            ..Default::default()
        };
        let value = col.bean_value_of(&invoice).unwrap();
        assert_eq!(value.downcast_ref::<i64>(), Some(&5));
    }

    #[test]
    fn conversions_are_pure() {
        let col = ColumnDescriptor::builder("number", |i: &Invoice| i.number.clone())
            .build()
            .unwrap();
        let invoice = Invoice {
            number: "INV-1".to_string(),
            ..Default::default()
        };
        let before = invoice.clone();
        let first = col.bind_value(&invoice).unwrap();
        let second = col.bind_value(&invoice).unwrap();
        assert_eq!(first, second);
        assert_eq!(invoice, before);
    }

    #[test]
    fn missing_populator_is_reported() {
        let col = ColumnDescriptor::builder("number", |i: &Invoice| i.number.clone())
            .build()
            .unwrap();
        let mut invoice = Invoice::default();
        let err = col.populate(&mut invoice, Value::from("x")).unwrap_err();
        assert_eq!(
            err,
            ColumnError::MissingPopulator {
                column: "number".to_string()
            }
        );
    }

    #[test]
    fn populate_errors_carry_column_name() {
        let col = ColumnDescriptor::builder("lines", |i: &Invoice| i.lines)
            .column_name("line_count")
            .setter(|i, v| i.lines = v)
            .build()
            .unwrap();
        let mut invoice = Invoice::default();
        let err = col.populate(&mut invoice, Value::Null).unwrap_err();
        assert_eq!(
            err,
            ColumnError::UnexpectedNull {
                column: "line_count".to_string()
            }
        );
    }

    #[test]
    fn custom_conversion_round_trips() {
        #[derive(Debug, Clone, PartialEq)]
        struct Ticket {
            status: Status,
        }

        let col = ColumnDescriptor::custom(
            "status",
            ParamType::Text,
            |t: &Ticket| t.status,
            |s: &Status| match s {
                Status::Open => Value::from("open"),
                Status::Closed => Value::from("closed"),
            },
            |v: Value| match v {
                Value::String(s) if s == "open" => Ok(Status::Open),
                Value::String(s) if s == "closed" => Ok(Status::Closed),
                other => Err(ColumnError::TypeMismatch {
                    column: String::new(),
                    expected: "status".to_string(),
                    found: other.kind().to_string(),
                }),
            },
        )
        .setter(|t, s| t.status = s)
        .build()
        .unwrap();

        let original = Ticket {
            status: Status::Closed,
        };
        let param = col.bind_value(&original).unwrap();
        assert_eq!(param, Value::from("closed"));

        let mut fresh = Ticket {
            status: Status::Open,
        };
        col.populate(&mut fresh, param).unwrap();
        assert_eq!(fresh, original);
    }

    #[test]
    fn custom_conversion_is_checked_per_call() {
        let col = ColumnDescriptor::custom(
            "id",
            ParamType::Text,
            |i: &Invoice| i.id,
            |n: &i64| Value::Int(*n),
            i64::from_value,
        )
        .build()
        .unwrap();
        let err = col.convert(&1).unwrap_err();
        assert_eq!(
            err,
            ColumnError::ParamTypeMismatch {
                column: "id".to_string(),
                declared: ParamType::Text,
                produced: ParamType::Integer,
            }
        );
    }

    fn bound_and_read_back<C: ColumnValue>(col: &ColumnDescriptor<Meter, C>, meter: &Meter) -> Meter {
        let mut params = BoundParameters::default();
        bind_column(col, meter, &mut params).unwrap();
        let (_, stored) = params.params()[0].clone();
        let mut fresh = Meter::default();
        col.populate(&mut fresh, stored).unwrap();
        fresh
    }

    #[test]
    fn integer_widened_to_double_reads_back() {
        let col = ColumnDescriptor::builder("reading", |m: &Meter| m.reading)
            .param_type(ParamType::Double)
            .setter(|m, v| m.reading = v)
            .build()
            .unwrap();
        let meter = Meter {
            reading: 42,
            ..Default::default()
        };
        assert_eq!(bound_and_read_back(&col, &meter).reading, 42);
    }

    #[test]
    fn integer_widened_to_json_reads_back() {
        let col = ColumnDescriptor::builder("reading", |m: &Meter| m.reading)
            .param_type(ParamType::Json)
            .setter(|m, v| m.reading = v)
            .build()
            .unwrap();
        let meter = Meter {
            reading: -7,
            ..Default::default()
        };
        assert_eq!(bound_and_read_back(&col, &meter).reading, -7);
    }

    #[test]
    fn timestamp_widened_to_json_reads_back() {
        let col = ColumnDescriptor::builder("calibrated_at", |m: &Meter| m.calibrated_at)
            .param_type(ParamType::Json)
            .setter(|m, v| m.calibrated_at = v)
            .build()
            .unwrap();
        let meter = Meter {
            calibrated_at: Some(crate::Timestamp::parse("2024-03-04T05:06:07.080910Z").unwrap()),
            ..Default::default()
        };
        assert_eq!(
            bound_and_read_back(&col, &meter).calibrated_at,
            meter.calibrated_at
        );
    }

    #[test]
    fn fractional_double_is_not_truncated_into_integer() {
        let col = ColumnDescriptor::builder("reading", |m: &Meter| m.reading)
            .param_type(ParamType::Double)
            .setter(|m, v| m.reading = v)
            .build()
            .unwrap();
        let mut meter = Meter::default();
        let err = col.populate(&mut meter, Value::Float(1.5)).unwrap_err();
        assert!(matches!(err, ColumnError::TypeMismatch { .. }));
        assert_eq!(meter.reading, 0);
    }

    #[test]
    fn unsigned_above_bigint_is_out_of_range() {
        let col = ColumnDescriptor::builder("serial", |m: &Meter| m.serial)
            .build()
            .unwrap();
        let meter = Meter {
            serial: u64::MAX,
            ..Default::default()
        };
        let err = col.bind_value(&meter).unwrap_err();
        assert_eq!(
            err,
            ColumnError::ValueOutOfRange {
                column: "serial".to_string(),
                value: u64::MAX.to_string(),
            }
        );

        let meter = Meter {
            serial: i64::MAX as u64,
            ..Default::default()
        };
        assert_eq!(col.bind_value(&meter).unwrap(), Value::UInt(i64::MAX as u64));
    }
}
