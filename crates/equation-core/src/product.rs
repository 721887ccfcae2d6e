use serde::Serialize;

/// Product version that introduced user-mode temperature bounds.
const USER_MODE_VERSION: &str = "v2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub user_mode: bool,
}

impl Capabilities {
    /// Expects an already lower-cased product version.
    pub fn for_version(product_version: &str) -> Self {
        Self {
            user_mode: product_version == USER_MODE_VERSION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProductInfo {
    pub product_type: &'static str,
    pub product_version: &'static str,
    pub name: &'static str,
    pub model: &'static str,
}

const PRODUCTS: &[ProductInfo] = &[
    ProductInfo {
        product_type: "radiator",
        product_version: "v1",
        name: "Equation Radiator",
        model: "radiator-v1",
    },
    ProductInfo {
        product_type: "radiator",
        product_version: "v2",
        name: "Equation Radiator V2",
        model: "radiator-v2",
    },
    ProductInfo {
        product_type: "towel",
        product_version: "v1",
        name: "Equation Towel Rail",
        model: "towel-v1",
    },
    ProductInfo {
        product_type: "towel",
        product_version: "v2",
        name: "Equation Towel Rail V2",
        model: "towel-v2",
    },
];

/// Unknown pairs yield `None` so unseen hardware still loads.
pub fn product_by_type_version(product_type: &str, product_version: &str) -> Option<&'static ProductInfo> {
    PRODUCTS
        .iter()
        .find(|p| p.product_type == product_type && p.product_version == product_version)
}
