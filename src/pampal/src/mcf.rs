//! Min-cost flow encoding of the migration problem, in the line-oriented
//! format read by DIMACS-style solvers:
//!
//! ```text
//! c comment
//! p min <nodes> <arcs>
//! n <node> <supply>
//! a <tail> <head> <lower bound> <upper bound> <cost>
//! ```
//!
//! Node 0 is the source, nodes `1..=2n` are the VM legs (all VMs first, then
//! all VMPs), the next `numPM` nodes are the physical machines and the last
//! node is the sink.

use std::io::{BufRead, Write};
use std::path::Path;
use std::str::FromStr;

use crate::datacenter::DataCenter;
use crate::{Cost, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arc {
    pub tail: usize,
    pub head: usize,
    pub lower: u64,
    pub upper: u64,
    pub cost: Cost,
}

impl Arc {
    #[inline]
    pub fn new(tail: usize, head: usize, lower: u64, upper: u64, cost: Cost) -> Self {
        Arc {
            tail,
            head,
            lower,
            upper,
            cost,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowProblem {
    pub num_nodes: usize,
    /// `(node, supply)`, positive at the source, negative at the sink
    pub supplies: Vec<(usize, i64)>,
    pub arcs: Vec<Arc>,
    /// header comment lines, without the leading `c `
    pub comments: Vec<String>,
}

impl FlowProblem {
    pub fn from_datacenter(dc: &DataCenter) -> Self {
        let n = dc.num_vm_pairs();
        let num_pms = dc.num_pms();
        let legs = 2 * n;
        let source = 0;
        let sink = legs + num_pms + 1;
        let pm_node = |pm: usize| legs + 1 + pm;

        let mut arcs = Vec::with_capacity(legs + legs * num_pms + num_pms);
        for leg in 1..=legs {
            arcs.push(Arc::new(source, leg, 0, 1, 0));
        }

        let coef = dc.migration_coef();
        for leg in 0..legs {
            let (pair, current) = if leg < n {
                (leg, dc.placement()[leg].vm)
            } else {
                (leg - n, dc.placement()[leg - n].vmp)
            };
            let freq = dc.frequency(pair);
            for pm in 0..num_pms {
                let endpoint = if leg < n {
                    dc.dist_to_first(pm)
                } else {
                    dc.dist_to_last(pm)
                };
                let cost = coef * dc.distance(current, pm) + freq * endpoint;
                arcs.push(Arc::new(leg + 1, pm_node(pm), 0, 1, cost));
            }
        }

        for pm in 0..num_pms {
            arcs.push(Arc::new(pm_node(pm), sink, 0, dc.resources() as u64, 0));
        }

        let s = dc.setting();
        let comments = vec![
            "**** INFORMATION ABOUT DATA CENTER ****".to_owned(),
            format!("Number of Pods (k): {}", s.topology.pods),
            format!("Migration Coefficient: {}", s.topology.migration_coef),
            format!("Number of Virtual machines Pairs: {}", n),
            format!("Number of Middle Boxes: {}", dc.num_middleboxes()),
            format!("Number of resources: {}", dc.resources()),
            format!("Total distance between middle boxes: {}", dc.backbone_cost()),
            format!("Total communication Frequencies: {}", dc.total_frequency()),
            format!(
                "Cost from first middle box to last middle box: {}",
                dc.total_backbone_traffic()
            ),
            format!("Initial Communication Cost before migration: {}", dc.initial_cost()),
            "***** Minimum Cost Flow *******".to_owned(),
        ];

        FlowProblem {
            num_nodes: sink + 1,
            supplies: vec![(source, legs as i64), (sink, -(legs as i64))],
            arcs,
            comments,
        }
    }

    #[inline]
    pub fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        for c in &self.comments {
            writeln!(w, "c {}", c)?;
        }
        writeln!(w, "p min {} {}", self.num_nodes, self.num_arcs())?;
        writeln!(
            w,
            "c min-cost flow problem with {} nodes and {} arcs",
            self.num_nodes,
            self.num_arcs()
        )?;
        for &(node, supply) in &self.supplies {
            writeln!(w, "n {} {}", node, supply)?;
        }
        writeln!(w, "c arc list follows")?;
        writeln!(w, "c arc has <tail> <head> <capacity l.b.> <capacity u.b> <cost>")?;
        for a in &self.arcs {
            writeln!(w, "a {} {} {} {} {}", a.tail, a.head, a.lower, a.upper, a.cost)?;
        }
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        let mut w = std::io::BufWriter::new(file);
        self.write_to(&mut w)?;
        w.flush()?;
        log::info!(
            "min-cost flow problem with {} nodes and {} arcs written to {}",
            self.num_nodes,
            self.num_arcs(),
            path.as_ref().display()
        );
        Ok(())
    }
}

impl std::fmt::Display for FlowProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut buf = Vec::new();
        self.write_to(&mut buf).map_err(|_| std::fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

fn field<T: FromStr>(tokens: &[&str], i: usize, line: usize) -> Result<T> {
    tokens
        .get(i)
        .ok_or_else(|| Error::MalformedProblem {
            line,
            reason: format!("missing field {}", i),
        })?
        .parse()
        .map_err(|_| Error::MalformedProblem {
            line,
            reason: format!("cannot parse field {}: {}", i, tokens[i]),
        })
}

impl FromStr for FlowProblem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut problem = FlowProblem::default();
        let mut expected_arcs = None;

        for (i, raw) in s.lines().enumerate() {
            let line = i + 1;
            let tokens: Vec<&str> = raw.split_whitespace().collect();
            match tokens.first().copied() {
                None => {}
                Some("c") => {
                    // only the header before the problem line is kept
                    if expected_arcs.is_none() {
                        problem.comments.push(raw.trim_start()[1..].trim().to_owned());
                    }
                }
                Some("p") => {
                    if expected_arcs.is_some() {
                        return Err(Error::MalformedProblem {
                            line,
                            reason: "duplicate problem line".to_owned(),
                        });
                    }
                    if tokens.get(1) != Some(&"min") {
                        return Err(Error::MalformedProblem {
                            line,
                            reason: "not a min-cost flow problem".to_owned(),
                        });
                    }
                    problem.num_nodes = field(&tokens, 2, line)?;
                    expected_arcs = Some(field::<usize>(&tokens, 3, line)?);
                }
                Some(kind) if expected_arcs.is_none() => {
                    return Err(Error::MalformedProblem {
                        line,
                        reason: format!("'{}' before the problem line", kind),
                    });
                }
                Some("n") => {
                    let node: usize = field(&tokens, 1, line)?;
                    if node >= problem.num_nodes {
                        return Err(Error::MalformedProblem {
                            line,
                            reason: format!("node {} out of range", node),
                        });
                    }
                    problem.supplies.push((node, field(&tokens, 2, line)?));
                }
                Some("a") => {
                    let arc = Arc::new(
                        field(&tokens, 1, line)?,
                        field(&tokens, 2, line)?,
                        field(&tokens, 3, line)?,
                        field(&tokens, 4, line)?,
                        field(&tokens, 5, line)?,
                    );
                    if arc.tail >= problem.num_nodes || arc.head >= problem.num_nodes {
                        return Err(Error::MalformedProblem {
                            line,
                            reason: format!("arc {} -> {} out of range", arc.tail, arc.head),
                        });
                    }
                    problem.arcs.push(arc);
                }
                Some(kind) => {
                    return Err(Error::MalformedProblem {
                        line,
                        reason: format!("unknown line type '{}'", kind),
                    });
                }
            }
        }

        match expected_arcs {
            None => Err(Error::MalformedProblem {
                line: 0,
                reason: "no problem line".to_owned(),
            }),
            Some(n) if n != problem.arcs.len() => Err(Error::MalformedProblem {
                line: 0,
                reason: format!("expected {} arcs, found {}", n, problem.arcs.len()),
            }),
            Some(_) => Ok(problem),
        }
    }
}

/// Total flow cost from a solver result: the second token of the first line
/// starting with `s`.
pub fn parse_summary<R: BufRead>(reader: R) -> Result<Cost> {
    for line in reader.lines() {
        let line = line?;
        if line.starts_with('s') {
            return line
                .split_whitespace()
                .nth(1)
                .and_then(|tok| tok.parse().ok())
                .ok_or(Error::SolverResultParse);
        }
    }
    Err(Error::SolverResultParse)
}

/// Migration plus communication cost behind a solver result. The flow cost
/// covers the legs, the chain itself is added here.
pub fn total_cost_from_summary<R: BufRead>(dc: &DataCenter, reader: R) -> Result<Cost> {
    Ok(parse_summary(reader)? + dc.total_backbone_traffic())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architecture::FatTreeArgs;
    use crate::datacenter::{DataCenterSetting, PairPlacement};

    fn datacenter() -> DataCenter {
        let setting = DataCenterSetting::new(FatTreeArgs::new(4, 3), 2, 2, 2, 1000);
        let placement = vec![PairPlacement::new(0, 1), PairPlacement::new(4, 15)];
        DataCenter::from_parts(setting, &[0, 2], placement, vec![10, 100]).unwrap()
    }

    #[test]
    fn problem_sizes() {
        let dc = datacenter();
        let p = FlowProblem::from_datacenter(&dc);
        assert_eq!(p.num_nodes, 2 * 2 + 16 + 2);
        assert_eq!(p.num_arcs(), 4 + 4 * 16 + 16);
        assert_eq!(p.supplies, vec![(0, 4), (21, -4)]);
    }

    #[test]
    fn arc_costs() {
        let dc = datacenter();
        let p = FlowProblem::from_datacenter(&dc);
        let arc = |tail: usize, pm: usize| {
            *p.arcs
                .iter()
                .find(|a| a.tail == tail && a.head == 5 + pm)
                .unwrap()
        };
        // VM of pair 0 staying on pm 0: 2 hops to agg 0
        assert_eq!(arc(1, 0).cost, 10 * 2);
        // VM of pair 1 moving from pm 4 to pm 0
        assert_eq!(arc(2, 0).cost, 3 * 6 + 100 * 2);
        // VMP of pair 0 staying on pm 1: 4 hops to agg 2
        assert_eq!(arc(3, 1).cost, 10 * 4);
        // VMP of pair 1 moving from pm 15 to pm 4, next to agg 2
        assert_eq!(arc(4, 4).cost, 3 * 6 + 100 * 2);
        assert!(p.arcs.iter().filter(|a| a.head == 21).all(|a| a.upper == 2 && a.cost == 0));
    }

    #[test]
    fn text_layout() {
        let dc = datacenter();
        let text = FlowProblem::from_datacenter(&dc).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "c **** INFORMATION ABOUT DATA CENTER ****");
        assert!(lines.contains(&"p min 22 84"));
        assert!(lines.contains(&"n 0 4"));
        assert!(lines.contains(&"n 21 -4"));
        assert!(lines.contains(&"a 0 1 0 1 0"));
        assert!(lines.contains(&"a 20 21 0 2 0"));
        assert!(lines.iter().all(|l| !l.is_empty()));
    }

    #[test]
    fn reader_rejects_bad_input() {
        assert!(matches!(
            "a 0 1 0 1 0\n".parse::<FlowProblem>(),
            Err(Error::MalformedProblem { line: 1, .. })
        ));
        assert!(matches!(
            "p min 2 2\na 0 1 0 1 0\n".parse::<FlowProblem>(),
            Err(Error::MalformedProblem { line: 0, .. })
        ));
        assert!(matches!(
            "p min 2 1\na 0 2 0 1 0\n".parse::<FlowProblem>(),
            Err(Error::MalformedProblem { line: 2, .. })
        ));
        assert!(matches!(
            "p min 2 1\na 0 1 zero 1 0\n".parse::<FlowProblem>(),
            Err(Error::MalformedProblem { line: 2, .. })
        ));
    }

    #[test]
    fn summary_line() {
        let out = "c solver output\nf 3 1\ns 1234\ns 99\n";
        assert_eq!(parse_summary(out.as_bytes()).unwrap(), 1234);
        assert!(matches!(
            parse_summary("c nothing here\n".as_bytes()),
            Err(Error::SolverResultParse)
        ));
        assert!(matches!(parse_summary("s\n".as_bytes()), Err(Error::SolverResultParse)));

        let dc = datacenter();
        // backbone 2 hops, 110 total frequency
        assert_eq!(total_cost_from_summary(&dc, "s 1000".as_bytes()).unwrap(), 1000 + 220);
    }
}
