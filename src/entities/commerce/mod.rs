/// Catalog entities owned by or linked to a product
pub mod category;
pub mod product_category;
pub mod product_image;
pub mod product_tag;
pub mod product_variant;
pub mod tag;

// Re-export entities
pub use super::product::{Entity as Product, Model as ProductModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use product_image::{Entity as ProductImage, Model as ProductImageModel};
pub use product_variant::{Entity as ProductVariant, Model as ProductVariantModel};
pub use tag::{Entity as Tag, Model as TagModel};
