use std::fmt;

/// A table column: JSON key on the record and its header label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
    pub key: &'static str,
    pub header: &'static str,
}

const fn col(key: &'static str, header: &'static str) -> Column {
    Column { key, header }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    Arrivals,
    Kitchen,
    Materials,
    Suppliers,
    Foremen,
    Payments,
    Expenses,
}

impl Resource {
    pub const ALL: [Resource; 7] = [
        Resource::Arrivals,
        Resource::Kitchen,
        Resource::Materials,
        Resource::Suppliers,
        Resource::Foremen,
        Resource::Payments,
        Resource::Expenses,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "arrivals" | "arrival" => Some(Self::Arrivals),
            "kitchen" | "kitchen-stock" | "kitchen_stock" => Some(Self::Kitchen),
            "materials" | "material" => Some(Self::Materials),
            "suppliers" | "supplier" => Some(Self::Suppliers),
            "foremen" | "foreman" => Some(Self::Foremen),
            "payments" | "payment" => Some(Self::Payments),
            "expenses" | "expense" => Some(Self::Expenses),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Arrivals => "arrivals",
            Self::Kitchen => "kitchen",
            Self::Materials => "materials",
            Self::Suppliers => "suppliers",
            Self::Foremen => "foremen",
            Self::Payments => "payments",
            Self::Expenses => "expenses",
        }
    }

    /// Path segment of the resource's collection endpoint.
    pub fn path(&self) -> &'static str {
        self.name()
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Arrivals => "Arrivals",
            Self::Kitchen => "Kitchen stock",
            Self::Materials => "Materials",
            Self::Suppliers => "Suppliers",
            Self::Foremen => "Foremen",
            Self::Payments => "Payments",
            Self::Expenses => "Expenses",
        }
    }

    pub fn columns(&self) -> &'static [Column] {
        const ARRIVALS: &[Column] = &[
            col("id", "ID"),
            col("date", "Date"),
            col("material", "Material"),
            col("supplier", "Supplier"),
            col("quantity", "Qty"),
            col("unit", "Unit"),
            col("price", "Price"),
            col("total", "Total"),
        ];
        const KITCHEN: &[Column] = &[
            col("id", "ID"),
            col("name", "Name"),
            col("quantity", "Qty"),
            col("unit", "Unit"),
            col("date", "Updated"),
        ];
        const MATERIALS: &[Column] = &[
            col("id", "ID"),
            col("name", "Name"),
            col("unit", "Unit"),
            col("quantity", "In stock"),
            col("price", "Price"),
        ];
        const SUPPLIERS: &[Column] = &[
            col("id", "ID"),
            col("name", "Name"),
            col("phone", "Phone"),
            col("balance", "Balance"),
        ];
        const FOREMEN: &[Column] = &[
            col("id", "ID"),
            col("full_name", "Name"),
            col("phone", "Phone"),
            col("balance", "Balance"),
        ];
        const PAYMENTS: &[Column] = &[
            col("id", "ID"),
            col("date", "Date"),
            col("supplier", "Supplier"),
            col("amount", "Amount"),
            col("method", "Method"),
        ];
        const EXPENSES: &[Column] = &[
            col("id", "ID"),
            col("date", "Date"),
            col("category", "Category"),
            col("amount", "Amount"),
            col("comment", "Comment"),
        ];
        match self {
            Self::Arrivals => ARRIVALS,
            Self::Kitchen => KITCHEN,
            Self::Materials => MATERIALS,
            Self::Suppliers => SUPPLIERS,
            Self::Foremen => FOREMEN,
            Self::Payments => PAYMENTS,
            Self::Expenses => EXPENSES,
        }
    }

    pub fn default_export_name(&self) -> String {
        format!("{}-export.xlsx", self.name())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
