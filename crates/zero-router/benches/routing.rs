//! Routing benchmarks for the path trie.
//!
//! Run with: cargo bench -p zero-router

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use http::Method;

use zero_router::Router;

/// Generate a set of realistic API routes.
fn generate_routes(count: usize) -> Vec<(Method, String)> {
    let resources = [
        "users",
        "orders",
        "products",
        "customers",
        "invoices",
        "payments",
    ];
    let methods = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

    let mut routes = Vec::new();

    for resource in &resources {
        routes.push((Method::GET, format!("/{}", resource)));
        routes.push((Method::POST, format!("/{}", resource)));
        routes.push((Method::GET, format!("/{}/:id", resource)));
        routes.push((Method::PUT, format!("/{}/:id", resource)));
        routes.push((Method::DELETE, format!("/{}/:id", resource)));
    }

    routes.push((Method::GET, "/users/:userId/orders".to_string()));
    routes.push((Method::GET, "/users/:userId/orders/:orderId".to_string()));
    routes.push((Method::GET, "/assets/*filepath".to_string()));

    while routes.len() < count {
        let i = routes.len();
        let resource = resources[i % resources.len()];
        let method = methods[i % methods.len()].clone();
        routes.push((method, format!("/api/v{}/{}", i / 10, resource)));
    }

    routes.truncate(count);
    routes
}

fn build_router(routes: &[(Method, String)]) -> Router<usize> {
    let mut router = Router::new();
    for (i, (method, pattern)) in routes.iter().enumerate() {
        router
            .insert(method.clone(), pattern, vec![i])
            .expect("generated patterns are valid");
    }
    router
}

fn bench_router_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("router_lookup");

    for route_count in [10, 50, 100, 500, 1000] {
        let routes = generate_routes(route_count);
        let router = build_router(&routes);

        for (name, path) in [
            ("static_path", "/users"),
            ("param_path", "/users/12345"),
            ("nested_param_path", "/users/12345/orders/67890"),
            ("wildcard_path", "/assets/css/vendor/app.css"),
            ("not_found", "/nonexistent/path/here"),
        ] {
            group.bench_with_input(BenchmarkId::new(name, route_count), &router, |b, router| {
                b.iter(|| {
                    let _ = black_box(router.lookup(&Method::GET, path));
                });
            });
        }
    }

    group.finish();
}

fn bench_router_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("router_insert");

    for route_count in [10, 50, 100, 500] {
        let routes = generate_routes(route_count);

        group.bench_with_input(
            BenchmarkId::new("build_router", route_count),
            &routes,
            |b, routes| {
                b.iter(|| {
                    black_box(build_router(routes));
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_router_lookup, bench_router_insert);
criterion_main!(benches);
