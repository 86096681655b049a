// src/renderer.rs

use crate::error::FormatError;
use crate::model::{AuthorIdentity, OwnershipOptions, OwnershipResult};
use chrono::Local;
use palette::{FromColor, Lch, Srgb};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::f64::consts::TAU;
use std::fmt::Write;

const WIDTH: f64 = 960.0;
const HEIGHT: f64 = 640.0;
const UNCLUSTERED_COLOR: &str = "#9e9e9e";

/// One author in the graph
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GraphNode {
    pub id: usize,
    #[serde(flatten)]
    pub author: AuthorIdentity,
    pub owned_lines: u64,
    pub avg_line_age_days: u64,
    pub owned_lines_duplicate: u64,
    /// First cluster (1-based) the author belongs to
    pub cluster: Option<usize>,
    pub color: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// Two authors sharing a cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GraphLink {
    pub source: usize,
    pub target: usize,
    pub cluster: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GraphCluster {
    pub index: usize,
    pub color: String,
    /// Node ids in the engine's member order
    pub members: Vec<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OwnershipGraph {
    pub commit_id: String,
    pub width: f64,
    pub height: f64,
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    pub clusters: Vec<GraphCluster>,
}

/// Derive the graph from a result. Node ids follow the author ranking.
pub fn build_graph(result: &OwnershipResult) -> Result<OwnershipGraph, FormatError> {
    let ranked = result.ranked_authors();
    let colors = generate_cluster_colors(result.author_clusters.len());

    let mut clusters = Vec::with_capacity(result.author_clusters.len());
    for (idx, (cluster, color)) in result.author_clusters.iter().zip(colors).enumerate() {
        let members = cluster
            .authors
            .iter()
            .map(|identity| {
                ranked
                    .iter()
                    .position(|stat| &stat.author == identity)
                    .ok_or_else(|| FormatError::UnknownClusterAuthor {
                        cluster: idx + 1,
                        author: identity.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        clusters.push(GraphCluster {
            index: idx + 1,
            color,
            members,
        });
    }

    // An author listed in several clusters is drawn with the first one
    let mut primary: Vec<Option<usize>> = vec![None; ranked.len()];
    for (ci, cluster) in clusters.iter().enumerate() {
        for &member in &cluster.members {
            primary[member].get_or_insert(ci);
        }
    }

    let positions = layout(&primary, clusters.len());
    let max_lines = ranked.first().map_or(0, |s| s.owned_lines_total).max(1) as f64;

    let nodes = ranked
        .iter()
        .enumerate()
        .map(|(id, stat)| {
            let (x, y) = positions[id];
            GraphNode {
                id,
                author: stat.author.clone(),
                owned_lines: stat.owned_lines_total,
                avg_line_age_days: stat.avg_line_age_days(),
                owned_lines_duplicate: stat.owned_lines_duplicate,
                cluster: primary[id].map(|ci| clusters[ci].index),
                color: primary[id].map_or_else(|| UNCLUSTERED_COLOR.to_string(), |ci| clusters[ci].color.clone()),
                x,
                y,
                radius: 5.0 + 20.0 * (stat.owned_lines_total as f64 / max_lines).sqrt(),
            }
        })
        .collect();

    let mut links = Vec::new();
    for cluster in &clusters {
        for (i, &source) in cluster.members.iter().enumerate() {
            for &target in &cluster.members[i + 1..] {
                links.push(GraphLink {
                    source,
                    target,
                    cluster: cluster.index,
                });
            }
        }
    }

    Ok(OwnershipGraph {
        commit_id: result.commit_id.clone(),
        width: WIDTH,
        height: HEIGHT,
        nodes,
        links,
        clusters,
    })
}

/// Groups sit on an orbit around the centre, members on a ring around their group
fn layout(primary: &[Option<usize>], cluster_count: usize) -> Vec<(f64, f64)> {
    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); cluster_count + 1];
    for (node, cluster) in primary.iter().enumerate() {
        groups[cluster.unwrap_or(cluster_count)].push(node);
    }
    groups.retain(|g| !g.is_empty());

    let (cx, cy) = (WIDTH / 2.0, HEIGHT / 2.0);
    let orbit = if groups.len() > 1 { HEIGHT * 0.32 } else { 0.0 };
    let mut positions = vec![(cx, cy); primary.len()];

    for (gi, group) in groups.iter().enumerate() {
        let angle = TAU * gi as f64 / groups.len() as f64;
        let (gx, gy) = (cx + orbit * angle.cos(), cy + orbit * angle.sin());
        let ring = if group.len() > 1 {
            (30.0 + 10.0 * group.len() as f64).min(HEIGHT * 0.25)
        } else {
            0.0
        };
        for (mi, &node) in group.iter().enumerate() {
            let a = TAU * mi as f64 / group.len() as f64;
            positions[node] = (gx + ring * a.cos(), gy + ring * a.sin());
        }
    }

    positions
}

fn generate_cluster_colors(num_clusters: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(42); // Seed for deterministic colors
    (0..num_clusters)
        .map(|_| {
            let hue = rng.gen_range(0.0f32..360.0f32);
            let color = Lch::new(70.0f32, 80.0f32, hue); // Bright, saturated colors
            let srgb: Srgb<f32> = Srgb::from_color(color);
            let (r, g, b) = srgb.into_components();
            format!("#{:02x}{:02x}{:02x}", to_u8(r), to_u8(g), to_u8(b))
        })
        .collect()
}

fn to_u8(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Render the standalone page served at `/`
pub fn render_page(result: &OwnershipResult, options: &OwnershipOptions, graph: &OwnershipGraph) -> String {
    let mut html = String::new();

    html.push_str(&render_head(result));
    html.push_str("<body>\n<div class=\"container\">\n");
    html.push_str(&render_header(result));
    html.push_str(&render_summary(result));
    html.push_str(&render_svg(graph));
    html.push_str(&render_author_table(result));
    html.push_str(&render_options(options));
    html.push_str("<p class=\"footer\">Raw data: <a href=\"/api/ownership\">/api/ownership</a> &middot; <a href=\"/api/graph\">/api/graph</a></p>\n");
    html.push_str("</div>\n");
    html.push_str(SCRIPT);
    html.push_str("</body>\n</html>\n");

    html
}

fn render_head(result: &OwnershipResult) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Code ownership - {}</title>
    <style>
{}
    </style>
</head>
"#,
        escape_html(short_commit(&result.commit_id)),
        CSS
    )
}

fn render_header(result: &OwnershipResult) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!(
        r#"<div class="header">
    <h1>Code ownership</h1>
    <p class="meta">Commit <code>{}</code> &middot; generated {}</p>
</div>
"#,
        escape_html(&result.commit_id),
        timestamp
    )
}

fn render_summary(result: &OwnershipResult) -> String {
    format!(
        r#"<div class="summary">
    <div class="metric"><span>{}</span>authors</div>
    <div class="metric"><span>{}</span>files</div>
    <div class="metric"><span>{}</span>avg line age (days)</div>
    <div class="metric"><span>{} ({}%)</span>duplicated lines</div>
</div>
"#,
        result.total_authors,
        result.total_files,
        result.avg_line_age_days(),
        result.duplicated_lines,
        crate::model::percent(result.duplicated_lines, result.total_lines)
    )
}

fn render_svg(graph: &OwnershipGraph) -> String {
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg id="graph" viewBox="0 0 {} {}" xmlns="http://www.w3.org/2000/svg">"#,
        graph.width, graph.height
    );

    svg.push_str("<g class=\"links\">\n");
    for link in &graph.links {
        let (source, target) = (&graph.nodes[link.source], &graph.nodes[link.target]);
        let color = graph
            .clusters
            .get(link.cluster - 1)
            .map_or(UNCLUSTERED_COLOR, |c| c.color.as_str());
        let _ = writeln!(
            svg,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" data-cluster="{}"/>"#,
            source.x, source.y, target.x, target.y, color, link.cluster
        );
    }
    svg.push_str("</g>\n<g class=\"nodes\">\n");

    for node in &graph.nodes {
        let cluster = node.cluster.map(|c| c.to_string()).unwrap_or_default();
        let _ = writeln!(
            svg,
            r#"<g class="node" data-cluster="{}"><title>{}&#10;lines: {}&#10;avg age: {} days&#10;duplicated: {}</title><circle cx="{:.1}" cy="{:.1}" r="{:.1}" fill="{}"/><text x="{:.1}" y="{:.1}">{}</text></g>"#,
            cluster,
            escape_html(&node.author.to_string()),
            node.owned_lines,
            node.avg_line_age_days,
            node.owned_lines_duplicate,
            node.x,
            node.y,
            node.radius,
            node.color,
            node.x,
            node.y + node.radius + 12.0,
            escape_html(&node.author.author_name)
        );
    }
    svg.push_str("</g>\n</svg>\n");

    svg
}

fn render_author_table(result: &OwnershipResult) -> String {
    let mut table = String::from(
        "<table class=\"authors\">\n<tr><th>Author</th><th>Owned lines</th><th>Avg age (days)</th><th>Duplicated</th><th>Originals</th><th>Copied by others</th></tr>\n",
    );
    for stat in result.ranked_authors() {
        let _ = writeln!(
            table,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&stat.author.to_string()),
            stat.owned_lines_total,
            stat.avg_line_age_days(),
            stat.owned_lines_duplicate,
            stat.owned_lines_duplicate_original,
            stat.owned_lines_duplicate_original_others
        );
    }
    table.push_str("</table>\n");
    table
}

fn render_options(options: &OwnershipOptions) -> String {
    let rows = [
        ("Repository", options.repo_dir.display().to_string()),
        ("Branch", options.branch.clone()),
        ("Commit", options.commit_id.clone()),
        ("Files", options.files_regex.clone()),
        ("Files excluded", options.files_not_regex.clone()),
        ("Authors", options.authors_regex.clone()),
        ("Authors excluded", options.authors_not_regex.clone()),
        ("Min duplicate lines", options.min_duplicate_lines.to_string()),
    ];

    let mut out = String::from("<table class=\"options\">\n");
    for (label, value) in rows {
        let _ = writeln!(out, "<tr><th>{}</th><td>{}</td></tr>", label, escape_html(&value));
    }
    out.push_str("</table>\n");
    out
}

fn short_commit(commit_id: &str) -> &str {
    commit_id.get(..12).unwrap_or(commit_id)
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const CSS: &str = r#"        body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 0; background: #f5f6f8; color: #1f2328; }
        .container { max-width: 1000px; margin: 0 auto; padding: 24px; }
        .header h1 { margin: 0 0 4px 0; }
        .meta { color: #656d76; margin: 0 0 16px 0; }
        .summary { display: flex; gap: 12px; margin-bottom: 16px; }
        .metric { flex: 1; background: #fff; border-radius: 6px; padding: 12px; color: #656d76; }
        .metric span { display: block; font-size: 1.6em; color: #1f2328; }
        #graph { width: 100%; background: #fff; border-radius: 6px; cursor: pointer; }
        .links line { stroke-width: 2; stroke-opacity: 0.6; }
        .node circle { stroke: #fff; stroke-width: 1.5; }
        .node text { font-size: 11px; text-anchor: middle; fill: #1f2328; }
        .dim { opacity: 0.15; }
        table { width: 100%; border-collapse: collapse; background: #fff; margin-top: 16px; border-radius: 6px; }
        th, td { text-align: left; padding: 6px 10px; border-bottom: 1px solid #eaeef2; }
        .options th { width: 30%; color: #656d76; font-weight: normal; }
        .footer { color: #656d76; font-size: 0.9em; }"#;

const SCRIPT: &str = r#"<script>
const svg = document.getElementById('graph');
let active = null;
svg.addEventListener('click', (ev) => {
    const node = ev.target.closest('.node');
    const cluster = node ? node.dataset.cluster : null;
    active = cluster && cluster !== active ? cluster : null;
    svg.querySelectorAll('[data-cluster]').forEach((el) => {
        el.classList.toggle('dim', active !== null && el.dataset.cluster !== active);
    });
});
</script>
"#;
