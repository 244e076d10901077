diesel::table! {
    categories (category_id) {
        category_id -> Int4,
        category_name -> Varchar,
        description -> Nullable<Text>,
    }
}

diesel::table! {
    orders (order_id) {
        order_id -> Int4,
        product_id -> Int4,
        supplier_id -> Int4,
        quantity_ordered -> Int4,
        order_date -> Timestamptz,
        status -> Varchar,
    }
}

diesel::table! {
    products (product_id) {
        product_id -> Int4,
        name -> Varchar,
        description -> Nullable<Text>,
        price -> Numeric,
        stock_quantity -> Int4,
        category_id -> Nullable<Int4>,
        reorder_level -> Nullable<Int4>,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    stock_transactions (transaction_id) {
        transaction_id -> Int4,
        product_id -> Int4,
        transaction_type -> Varchar,
        quantity -> Int4,
        note -> Nullable<Text>,
        user_id -> Nullable<Int4>,
        transaction_date -> Timestamptz,
    }
}

diesel::table! {
    suppliers (supplier_id) {
        supplier_id -> Int4,
        name -> Varchar,
        contact_email -> Nullable<Varchar>,
        contact_phone -> Nullable<Varchar>,
        address -> Nullable<Text>,
    }
}

diesel::table! {
    users (user_id) {
        user_id -> Int4,
        username -> Varchar,
        email -> Varchar,
        password_hash -> Varchar,
        role -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(orders -> products (product_id));
diesel::joinable!(orders -> suppliers (supplier_id));
diesel::joinable!(products -> categories (category_id));
diesel::joinable!(stock_transactions -> products (product_id));
diesel::joinable!(stock_transactions -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    categories,
    orders,
    products,
    stock_transactions,
    suppliers,
    users,
);
