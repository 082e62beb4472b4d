use std::collections::HashMap;
use crate::core::{DataType, DatabaseError, Value};
use super::definition::RoutineDefinition;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundVariable {
    pub data_type: DataType,
    pub value: Value,
}

/// Variables of one routine invocation: its parameters plus everything the
/// body DECLAREs. Dropped when the invocation returns.
#[derive(Debug, Clone, Default)]
pub struct RoutineBinding {
    routine: String,
    variables: HashMap<String, BoundVariable>,
}

impl RoutineBinding {
    #[must_use]
    pub fn new(routine: &str) -> Self {
        Self {
            routine: routine.to_string(),
            variables: HashMap::new(),
        }
    }

    /// Binds actual arguments to the routine's declared parameters
    pub fn bind(definition: &RoutineDefinition, args: &[Value]) -> Result<Self, DatabaseError> {
        let params = &definition.parameters;
        if args.len() != params.len() {
            let parameter = params
                .get(args.len())
                .map_or_else(|| format!("#{}", params.len() + 1), |p| p.name.clone());
            return Err(DatabaseError::ParameterTypeError {
                routine: definition.name.clone(),
                parameter,
                message: format!("expected {} argument(s), got {}", params.len(), args.len()),
            });
        }

        let mut binding = Self::new(&definition.name);
        for (param, arg) in params.iter().zip(args) {
            let value = arg.coerce_to(&param.data_type).map_err(|_| DatabaseError::ParameterTypeError {
                routine: definition.name.clone(),
                parameter: param.name.clone(),
                message: format!("expected {}, got {} '{arg}'", param.data_type, arg.data_type()),
            })?;
            binding.variables.insert(
                Self::normalize(&param.name),
                BoundVariable {
                    data_type: param.data_type,
                    value,
                },
            );
        }
        Ok(binding)
    }

    /// DECLARE: introduces (or re-declares) a variable with an initial value
    pub fn declare(&mut self, name: &str, data_type: DataType, value: &Value) -> Result<(), DatabaseError> {
        let value = value.coerce_to(&data_type)?;
        self.variables
            .insert(Self::normalize(name), BoundVariable { data_type, value });
        Ok(())
    }

    /// SET / SELECT INTO: assigns to an existing variable, coercing to its type
    pub fn assign(&mut self, name: &str, value: &Value) -> Result<(), DatabaseError> {
        let variable = self
            .variables
            .get_mut(&Self::normalize(name))
            .ok_or_else(|| DatabaseError::UnboundReference(name.to_string()))?;
        variable.value = value.coerce_to(&variable.data_type)?;
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(&Self::normalize(name)).map(|v| &v.value)
    }

    #[must_use]
    pub fn data_type(&self, name: &str) -> Option<DataType> {
        self.variables.get(&Self::normalize(name)).map(|v| v.data_type)
    }

    #[must_use]
    pub fn routine(&self) -> &str {
        &self.routine
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// `@ProductID`, `productid` and `PRODUCTID` name the same variable
    fn normalize(name: &str) -> String {
        name.trim_start_matches('@').to_ascii_lowercase()
    }
}
