use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        attributes::{
            AttributeList, AttributeValueInput, CreateAttributeRequest, CreateOptionRequest,
            ProductAttributeList, SetProductAttributesRequest, UpdateAttributeRequest,
        },
        auth::{LoginRequest, LoginResponse, RegisterRequest, SetRoleRequest, UpdateProfileRequest, UserList},
        cart::{AddToCartRequest, CartLine, CartView, UpdateCartItemRequest},
        categories::{
            BindAttributeRequest, CategoryList, CategoryTree, CreateCategoryRequest,
            EffectiveAttributeList, UpdateCategoryRequest,
        },
        compare::{AddCompareRequest, CompareGroup, CompareList, CompareRow},
        favorites::{AddFavoriteRequest, FavoriteProductList},
        orders::{CreateOrderRequest, OrderList, OrderWithItems, UpdateOrderStatusRequest},
        products::{
            CreateProductRequest, ProductDetails, ProductImageList, ProductList,
            ReorderImagesRequest, UpdateProductRequest,
        },
        shipping::{City, CityList, Warehouse, WarehouseList},
    },
    models::{
        Attribute, AttributeOption, AttributeType, AttributeWithOptions, Category, CategoryNode,
        CompareItem, EffectiveAttribute, Favorite, Order, OrderItem, OrderStatus, Product,
        ProductAttribute, ProductImage, User,
    },
    response::{ApiResponse, Meta},
    routes::{
        admin, attributes, auth, cart, categories, compare, favorites, health, orders, params,
        products, shipping,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        auth::update_me,
        categories::list_categories,
        categories::category_tree,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        categories::category_attributes,
        categories::bind_attribute,
        categories::unbind_attribute,
        attributes::list_attributes,
        attributes::get_attribute,
        attributes::create_attribute,
        attributes::update_attribute,
        attributes::delete_attribute,
        attributes::add_option,
        attributes::delete_option,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::product_attributes,
        products::set_product_attributes,
        products::upload_images,
        products::reorder_images,
        products::delete_image,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        favorites::list_favorites,
        favorites::add_favorite,
        favorites::remove_favorite,
        compare::list_compare,
        compare::add_compare,
        compare::remove_compare,
        compare::clear_compare,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        orders::cancel_order,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::list_users,
        admin::set_user_role,
        admin::list_low_stock,
        shipping::search_cities,
        shipping::list_warehouses
    ),
    components(
        schemas(
            User,
            Category,
            CategoryNode,
            Product,
            ProductImage,
            Attribute,
            AttributeType,
            AttributeOption,
            AttributeWithOptions,
            EffectiveAttribute,
            ProductAttribute,
            Favorite,
            CompareItem,
            Order,
            OrderItem,
            OrderStatus,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UpdateProfileRequest,
            SetRoleRequest,
            UserList,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            BindAttributeRequest,
            CategoryList,
            CategoryTree,
            EffectiveAttributeList,
            CreateAttributeRequest,
            UpdateAttributeRequest,
            CreateOptionRequest,
            AttributeValueInput,
            SetProductAttributesRequest,
            AttributeList,
            ProductAttributeList,
            CreateProductRequest,
            UpdateProductRequest,
            ReorderImagesRequest,
            ProductList,
            ProductImageList,
            ProductDetails,
            products::ImageUpload,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartLine,
            CartView,
            AddFavoriteRequest,
            FavoriteProductList,
            AddCompareRequest,
            CompareRow,
            CompareGroup,
            CompareList,
            CreateOrderRequest,
            UpdateOrderStatusRequest,
            OrderList,
            OrderWithItems,
            City,
            Warehouse,
            CityList,
            WarehouseList,
            health::HealthData,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            params::LowStockQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and profile"),
        (name = "Categories", description = "Category tree and attribute bindings"),
        (name = "Attributes", description = "Product characteristics and their options"),
        (name = "Products", description = "Catalog, product attributes and images"),
        (name = "Cart", description = "Shopping cart"),
        (name = "Favorites", description = "Favorite products"),
        (name = "Compare", description = "Product comparison"),
        (name = "Orders", description = "Checkout and order history"),
        (name = "Admin", description = "Admin endpoints"),
        (name = "Shipping", description = "Nova Poshta cities and branches"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
