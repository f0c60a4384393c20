pub mod attribute_options;
pub mod attributes;
pub mod cart_items;
pub mod categories;
pub mod category_attributes;
pub mod compare_items;
pub mod favorites;
pub mod order_items;
pub mod orders;
pub mod product_attribute_values;
pub mod product_images;
pub mod products;
pub mod users;

pub use attribute_options::Entity as AttributeOptions;
pub use attributes::Entity as Attributes;
pub use cart_items::Entity as CartItems;
pub use categories::Entity as Categories;
pub use category_attributes::Entity as CategoryAttributes;
pub use compare_items::Entity as CompareItems;
pub use favorites::Entity as Favorites;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use product_attribute_values::Entity as ProductAttributeValues;
pub use product_images::Entity as ProductImages;
pub use products::Entity as Products;
pub use users::Entity as Users;
