//! Resource categories.
//!
//! Every resource type maps to exactly one [`Category`]. The mapping is a
//! closed `match`; types it does not know fall back to [`Category::Unknown`]
//! instead of failing, so a new provider resource never breaks a run.

use std::{fmt, str::FromStr};

use serde::Deserialize;

/// Logical category of a resource, used for clustering, coloring and view
/// selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Dns,
    LoadBalancing,
    Network,
    Compute,
    Storage,
    Database,
    Observability,
    Identity,
    Security,
    Unknown,
}

impl Category {
    /// All categories, in declaration order.
    pub const ALL: [Category; 10] = [
        Category::Dns,
        Category::LoadBalancing,
        Category::Network,
        Category::Compute,
        Category::Storage,
        Category::Database,
        Category::Observability,
        Category::Identity,
        Category::Security,
        Category::Unknown,
    ];

    /// Classify a resource type.
    ///
    /// # Examples
    ///
    /// ```
    /// use infragram_core::category::Category;
    ///
    /// assert_eq!(Category::from_resource_type("aws_instance"), Category::Compute);
    /// assert_eq!(Category::from_resource_type("aws_iam_role"), Category::Identity);
    /// assert_eq!(Category::from_resource_type("random_pet"), Category::Unknown);
    /// ```
    pub fn from_resource_type(resource_type: &str) -> Self {
        match resource_type {
            "aws_route53_record" | "aws_route53_zone" => Category::Dns,

            "aws_lb" | "aws_alb" | "aws_elb" | "aws_lb_listener" | "aws_alb_listener"
            | "aws_lb_listener_rule" | "aws_lb_target_group" | "aws_alb_target_group"
            | "aws_lb_target_group_attachment" => Category::LoadBalancing,

            "aws_vpc" | "aws_subnet" | "aws_eip" | "aws_eip_association"
            | "aws_internet_gateway" | "aws_nat_gateway" | "aws_route_table"
            | "aws_route_table_association" | "aws_route" => Category::Network,

            "aws_instance" | "aws_launch_template" | "aws_autoscaling_group"
            | "aws_lambda_function" | "aws_lambda_permission" | "aws_ecs_service"
            | "aws_ecs_task_definition" | "aws_ecs_cluster" => Category::Compute,

            "aws_s3_bucket" | "aws_ebs_volume" | "aws_efs_file_system" => Category::Storage,

            "aws_db_instance" | "aws_rds_cluster" | "aws_dynamodb_table" => Category::Database,

            "aws_cloudwatch_log_group"
            | "aws_cloudwatch_log_subscription_filter"
            | "aws_cloudwatch_metric_alarm"
            | "aws_cloudwatch_log_stream" => Category::Observability,

            "aws_security_group" | "aws_security_group_rule" | "aws_acm_certificate"
            | "aws_acm_certificate_validation" | "aws_key_pair" => Category::Security,

            t if t.starts_with("aws_iam_") => Category::Identity,
            t if t.starts_with("aws_vpc_security_group_") => Category::Security,

            _ => Category::Unknown,
        }
    }
}

impl FromStr for Category {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dns" => Ok(Self::Dns),
            "load_balancing" => Ok(Self::LoadBalancing),
            "network" => Ok(Self::Network),
            "compute" => Ok(Self::Compute),
            "storage" => Ok(Self::Storage),
            "database" => Ok(Self::Database),
            "observability" => Ok(Self::Observability),
            "identity" => Ok(Self::Identity),
            "security" => Ok(Self::Security),
            "unknown" => Ok(Self::Unknown),
            _ => Err("Unsupported category"),
        }
    }
}

impl From<Category> for &'static str {
    fn from(val: Category) -> Self {
        match val {
            Category::Dns => "dns",
            Category::LoadBalancing => "load_balancing",
            Category::Network => "network",
            Category::Compute => "compute",
            Category::Storage => "storage",
            Category::Database => "database",
            Category::Observability => "observability",
            Category::Identity => "identity",
            Category::Security => "security",
            Category::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = (*self).into();
        write!(f, "{s}")
    }
}
