//! The fixed scan-configuration template posted when a policy is
//! created. Static configuration data: the only field computed per call
//! is the scope binding.

use serde_json::{json, Value};

pub const POLICY_DESC: &str = "managed by scopesync (v1)";

pub fn policy_payload(name: &str, scope_id: &str) -> Value {
    json!({
        "name": name,
        "desc": POLICY_DESC,
        "policy": {
            "domain_config": {
                "domain_brute": true,
                "alt_dns": true,
                "arl_search": true,
                "dns_query_plugin": true,
                "domain_brute_type": "big"
            },
            "ip_config": {
                "port_scan": true,
                "service_detection": true,
                "os_detection": true,
                "ssl_cert": true,
                "skip_scan_cdn_ip": true,
                "port_scan_type": "top1000",
                "port_custom": "",
                "host_timeout_type": "default",
                "host_timeout": 0,
                "port_parallelism": 16,
                "port_min_rate": 30
            },
            "npoc_service_detection": true,
            "site_config": {
                "site_identify": true,
                "search_engines": true,
                "site_spider": true,
                "site_capture": false,
                "nuclei_scan": true,
                "web_info_hunter": true
            },
            "file_leak": true,
            "poc_config": [
                { "plugin_name": "Actuator_noauth", "enable": true },
                { "plugin_name": "Docker_Remote_API_noauth", "enable": true },
                { "plugin_name": "Elasticsearch_noauth", "enable": true },
                { "plugin_name": "Grafana_Identify", "enable": true },
                { "plugin_name": "Kibana_noauth", "enable": true },
                { "plugin_name": "Memcached_noauth", "enable": true },
                { "plugin_name": "Mongodb_noauth", "enable": true },
                { "plugin_name": "Nacos_noauth", "enable": true },
                { "plugin_name": "Redis_noauth", "enable": true },
                { "plugin_name": "Shiro_Identify", "enable": true },
                { "plugin_name": "Swagger_Json_Identify", "enable": true },
                { "plugin_name": "ZooKeeper_noauth", "enable": true }
            ],
            "brute_config": [
                { "plugin_name": "FTPBrute", "enable": true },
                { "plugin_name": "MysqlBrute", "enable": true },
                { "plugin_name": "PostgreSQLBrute", "enable": true },
                { "plugin_name": "RedisBrute", "enable": true },
                { "plugin_name": "SSHBrute", "enable": true },
                { "plugin_name": "TomcatBrute", "enable": true }
            ],
            "scope_config": { "scope_id": scope_id }
        }
    })
}
