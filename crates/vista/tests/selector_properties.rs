// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use proptest::prelude::*;
use std::collections::HashSet;
use vista::descriptor::ChartSeries;
use vista::{select, ChartKind, Column, ColumnKind, Dataset, Value};

fn cell_strategy(numeric: bool) -> BoxedStrategy<Value> {
    if numeric {
        prop_oneof![
            9 => (-1000.0f64..1000.0).prop_map(Value::Number),
            1 => Just(Value::Null),
        ]
        .boxed()
    } else {
        prop_oneof![
            9 => "[a-m]{1,2}".prop_map(Value::Text),
            1 => Just(Value::Null),
        ]
        .boxed()
    }
}

fn date_cell_strategy() -> BoxedStrategy<Value> {
    prop_oneof![
        (1u32..=12, 1u32..=28).prop_map(|(m, d)| Value::Text(format!("{m:02}/{d:02}/2023"))),
        (1u32..=12, 1u32..=28).prop_map(|(m, d)| Value::Text(format!("2022-{m:02}-{d:02}"))),
        "[0-9]x[0-9]{1,2}".prop_map(Value::Text),
    ]
    .boxed()
}

prop_compose! {
    fn dataset_strategy()(
        rows in 0usize..70,
        numeric in 0usize..5,
        categorical in 0usize..3,
    )(
        numeric_cols in proptest::collection::vec(
            proptest::collection::vec(cell_strategy(true), rows), numeric),
        categorical_cols in proptest::collection::vec(
            proptest::collection::vec(cell_strategy(false), rows), categorical),
    ) -> Dataset {
        let mut columns = Vec::new();
        for (i, values) in numeric_cols.into_iter().enumerate() {
            columns.push(Column::with_kind(format!("n{i}"), ColumnKind::Numeric, values));
        }
        for (i, values) in categorical_cols.into_iter().enumerate() {
            columns.push(Column::with_kind(format!("c{i}"), ColumnKind::Categorical, values));
        }
        Dataset::new(columns).unwrap()
    }
}

proptest! {
    #[test]
    fn selection_is_bounded_and_unique(dataset in dataset_strategy()) {
        let charts = select(&dataset);
        prop_assert!(charts.len() <= 8);
        let kinds: HashSet<ChartKind> = charts.iter().map(|c| c.kind()).collect();
        prop_assert_eq!(kinds.len(), charts.len());
        if dataset.is_empty() {
            prop_assert!(charts.is_empty());
        } else {
            prop_assert_eq!(charts[0].kind(), ChartKind::Table);
        }
    }

    #[test]
    fn selection_follows_fixed_order(dataset in dataset_strategy()) {
        let charts = select(&dataset);
        let positions: Vec<usize> = charts
            .iter()
            .filter_map(|c| ChartKind::ALL.iter().position(|k| *k == c.kind()))
            .collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn descriptors_are_bounded_and_bound(dataset in dataset_strategy()) {
        for chart in select(&dataset) {
            prop_assert!(chart.check_against(&dataset).is_ok());
            match &chart.series {
                ChartSeries::Scatter(_) | ChartSeries::Line(_) | ChartSeries::Bubble(_) => {
                    prop_assert!(chart.series.point_count() <= 50);
                }
                ChartSeries::Pie(pie) => prop_assert!(pie.labels.len() <= 8),
                ChartSeries::Box(boxes) => prop_assert!(boxes.groups.len() <= 8),
                ChartSeries::Heatmap(heatmap) => {
                    let n = heatmap.labels.len();
                    prop_assert_eq!(heatmap.z.len(), n);
                    for i in 0..n {
                        prop_assert_eq!(heatmap.z[i][i], Some(1.0));
                        for j in 0..n {
                            prop_assert_eq!(heatmap.z[i][j], heatmap.z[j][i]);
                            if let Some(r) = heatmap.z[i][j] {
                                prop_assert!((-1.0..=1.0).contains(&r));
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    #[test]
    fn selection_is_deterministic(dataset in dataset_strategy()) {
        prop_assert_eq!(select(&dataset), select(&dataset));
    }

    #[test]
    fn mixed_date_text_keeps_line_chart(
        cells in proptest::collection::vec(date_cell_strategy(), 2..70)
    ) {
        let rows = cells.len();
        let dataset = Dataset::new(vec![
            Column::with_kind("order_date", ColumnKind::Categorical, cells),
            Column::numeric("val", (0..rows).map(|i| i as f64)),
        ])
        .unwrap();
        let charts = select(&dataset);
        prop_assert!(charts.iter().any(|c| c.kind() == ChartKind::Line));
    }
}
