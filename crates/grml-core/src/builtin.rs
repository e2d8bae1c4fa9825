//! Built-in model and function kinds.
//!
//! Domain-specific kinds (e.g. TensorFlow layers) register through the same
//! [`Registry`] calls used here.

use serde_json::json;

use crate::error::CoreError;
use crate::port::PortKind;
use crate::property::{PropertyEffect, PropertyKind, PropertySpec};
use crate::registry::{FunctionSpec, ModelSpec, PortSync, Registry};
use crate::types::DataType;
use crate::warning::Warning;

pub const PIPELINE_MODEL: &str = "grml-pipeline-model";
pub const COMPOSITE_MODEL: &str = "grml-composite-model";
pub const TEXT_MODEL: &str = "grml-text-model";

pub const INPUT: &str = "Input";
pub const OUTPUT: &str = "Output";
pub const LAYER: &str = "grml-composite-layer";
pub const COMPOSITE_NN: &str = "grml-composite-nn";
pub const TRAIN_TEST_SPLIT: &str = "train_test_split";
pub const VALIDATION: &str = "grml_model_validation";
pub const CUSTOM: &str = "Custom";

pub const CATEGORY_PREPROCESSING: &str = "Preprocessing";
pub const CATEGORY_VALIDATION: &str = "Validation";
pub const CATEGORY_MODELS: &str = "Models";
pub const CATEGORY_CUSTOM: &str = "Custom";
pub const CATEGORY_NEURONS: &str = "Neurons";

/// Datatype select shared by the composite Input and Output functions.
fn io_type_property(port: PortKind) -> PropertySpec {
    let options = vec![
        ("None".to_string(), DataType::None),
        ("Dataset".to_string(), DataType::dataset()),
        ("Model".to_string(), DataType::model()),
        ("Tensor".to_string(), DataType::tensor()),
    ];
    PropertySpec::new(
        "type",
        "Datatype",
        PropertyKind::Select {
            options: options.iter().map(|(name, _)| name.clone()).collect(),
        },
        json!("None"),
    )
    .described("The datatype expected at this port")
    .with_effect(PropertyEffect::PortType {
        port,
        index: 0,
        options,
        fallback: DataType::None,
    })
}

/// Registers the built-in kinds in declaration order.
pub fn register_builtins(registry: &mut Registry) -> Result<(), CoreError> {
    registry.register_function(
        FunctionSpec::new(INPUT, "Input")
            .return_value("", DataType::None)
            .property(io_type_property(PortKind::ReturnValue))
            .not_removable()
            .block_only(),
    )?;
    registry.register_function(
        FunctionSpec::new(OUTPUT, "Output")
            .parameter("", DataType::None)
            .property(io_type_property(PortKind::Parameter))
            .block_only(),
    )?;

    let layer_io = DataType::union(vec![DataType::dataset(), DataType::tensor()]);
    registry.register_function(
        FunctionSpec::new(LAYER, "Layer")
            .describe("A single layer of a composite network")
            .parameter("", layer_io.clone())
            .return_value("", layer_io)
            .code(["{ret.0} = layer({param.0})"]),
    )?;

    registry.register_function(
        FunctionSpec::new(COMPOSITE_NN, "Composite NN")
            .describe("A network composed of nested layers")
            .return_value("model", DataType::model())
            .code(["{ret.0} = compose({params})"])
            .submodel(COMPOSITE_MODEL)
            .sync_ports(PortSync::NestedIo {
                input: INPUT.to_string(),
                output: OUTPUT.to_string(),
            }),
    )?;

    registry.register_function(
        FunctionSpec::new(TRAIN_TEST_SPLIT, "Train/Test Split")
            .describe("Splits a dataset into a training and a test part")
            .parameter("", DataType::array_of(DataType::tensor()))
            .return_value("", DataType::array_of(DataType::tensor()))
            .return_value("", DataType::array_of(DataType::tensor()))
            .property(
                PropertySpec::new(
                    "ratio",
                    "Train/Test Ratio",
                    PropertyKind::Range {
                        min: 0.0,
                        max: 100.0,
                        step: 1.0,
                    },
                    json!(80),
                )
                .described("Percentage of samples used for training"),
            )
            .code([
                "{rets} = {params}.shuffle(ds_info.splits['train'].num_examples)",
                "dataset = tf.data.Dataset.from_tensor_slices(tensor_list)",
            ]),
    )?;

    registry.register_function(
        FunctionSpec::new(VALIDATION, "Validation")
            .describe("Evaluates a trained model on test data")
            .parameter("model", DataType::model())
            .parameter(
                "test_data",
                DataType::dataset_of(DataType::tuple(vec![DataType::tensor(), DataType::tensor()])),
            )
            .return_value(
                "loss, accuracy",
                DataType::labelled_tuple(vec![
                    ("loss", DataType::Number),
                    ("accuracy", DataType::Number),
                ]),
            )
            .executable()
            .code(["{ret.0} = {param.0}.evaluate({param.1})", "print({ret.0})"]),
    )?;

    registry.register_function(
        FunctionSpec::new(CUSTOM, "Custom")
            .describe("Free-form code")
            .code(["def "])
            .free_form()
            .warn(Warning::CustomFunctionNotSupported),
    )?;

    registry.register_model(
        ModelSpec::new(PIPELINE_MODEL, "Unnamed Pipeline")
            .offers(CATEGORY_PREPROCESSING)
            .offers(CATEGORY_VALIDATION)
            .offers(CATEGORY_MODELS)
            .offers(CATEGORY_CUSTOM),
    )?;
    registry.register_model(
        ModelSpec::new(COMPOSITE_MODEL, "Composite Model")
            .offers(CATEGORY_NEURONS)
            .starts_with(INPUT, 100.0, 100.0)
            .layered_from(INPUT),
    )?;
    registry.register_model(
        ModelSpec::new(TEXT_MODEL, "Unnamed Texteditor Pipeline")
            .offers(CATEGORY_PREPROCESSING)
            .offers(CATEGORY_VALIDATION)
            .offers(CATEGORY_MODELS)
            .offers(CATEGORY_CUSTOM),
    )?;

    registry.add_to_library(CATEGORY_PREPROCESSING, TRAIN_TEST_SPLIT)?;
    registry.add_to_library(CATEGORY_VALIDATION, VALIDATION)?;
    registry.add_to_library(CATEGORY_MODELS, COMPOSITE_NN)?;
    registry.add_to_library(CATEGORY_CUSTOM, CUSTOM)?;
    registry.add_to_library(CATEGORY_NEURONS, INPUT)?;
    registry.add_to_library(CATEGORY_NEURONS, OUTPUT)?;
    registry.add_to_library(CATEGORY_NEURONS, LAYER)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_register_in_declared_order() {
        let registry = Registry::with_builtins();
        let names: Vec<&str> = registry.functions().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![INPUT, OUTPUT, LAYER, COMPOSITE_NN, TRAIN_TEST_SPLIT, VALIDATION, CUSTOM]
        );
        let categories: Vec<&String> = registry.categories().collect();
        assert_eq!(
            categories,
            vec!["Preprocessing", "Validation", "Models", "Custom", "Neurons"]
        );
    }

    #[test]
    fn registering_twice_fails() {
        let mut registry = Registry::with_builtins();
        assert!(register_builtins(&mut registry).is_err());
    }

    #[test]
    fn composite_model_starts_with_an_input() {
        let registry = Registry::with_builtins();
        let spec = registry.model(COMPOSITE_MODEL).unwrap();
        assert_eq!(spec.initial_children.len(), 1);
        assert_eq!(spec.initial_children[0].function, INPUT);
        assert_eq!(spec.layer_root.as_deref(), Some(INPUT));
    }
}
