pub mod arrow;
pub mod types;

pub use self::arrow::{build_arrow_schema, map_to_arrow_type};
pub use self::types::{FieldSpec, FieldType};

/// Layout of the shipping table, in column order.
pub const SHIPPING_SCHEMA: [FieldSpec; 12] = [
    FieldSpec::required("Warehouse_ID", FieldType::Integer),
    FieldSpec::required("Warehouse_block", FieldType::String),
    FieldSpec::required("Mode_of_Shipment", FieldType::String),
    FieldSpec::required("Customer_care_calls", FieldType::Integer),
    FieldSpec::required("Customer_rating", FieldType::Integer),
    FieldSpec::required("Cost_of_the_Product", FieldType::Integer),
    FieldSpec::required("Prior_purchases", FieldType::Integer),
    FieldSpec::required("Product_importance", FieldType::String),
    FieldSpec::required("Gender", FieldType::String),
    FieldSpec::required("Discount_offered", FieldType::Integer),
    FieldSpec::required("Weight_in_gms", FieldType::Integer),
    FieldSpec::required("Reached_on_Time_Y_N", FieldType::Integer),
];
